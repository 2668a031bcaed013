use proc_macro::{TokenStream, TokenTree};

/// `load!(manager, "path/to/file.tsx")`
/// Hashes the path at compile time and expands to `manager.fast_load(path, PathHash(hash))`.
/// [`PathHash`] must be in scope at the call site.
#[proc_macro]
pub fn load(stream: TokenStream) -> TokenStream {
    let mut iter = stream.into_iter();

    // Asset manager arg
    let manager = iter.next().expect("Failed to parse manager arg");
    let manager = match manager {
        TokenTree::Ident(manager) => manager,
        _ => panic!("Manager arg was not an identifier"),
    };

    // Skips comma
    let comma = iter.next().expect("Missing comma");
    match &comma {
        TokenTree::Punct(punct) if punct.as_char() == ',' => {},
        _ => panic!("Expected comma"),
    }

    // Path arg
    let literal = match iter.next().expect("Failed to parse path") {
        TokenTree::Literal(literal) => literal.to_string(),
        _ => panic!("Expected literal"),
    };
    let path = match literal_path(&literal) {
        Ok(path) => path,
        Err(message) => panic!("{message}"),
    };

    // Trailing comma is fine, anything else is not
    match iter.next() {
        None => {},
        Some(TokenTree::Punct(punct)) if punct.as_char() == ',' && iter.next().is_none() => {},
        Some(_) => panic!("Unexpected third argument"),
    }

    let path_hash = fxhash::hash64(path);
    let result = format!("{manager}.fast_load({literal}, PathHash({path_hash}))");
    result.parse().unwrap()
}

/// Contents of a string literal as written in source, like `"a.tsx"` or `r#"a.tsx"#`.
/// Escapes are rejected so the hashed text is the same text the path holds at runtime.
fn literal_path(literal: &str) -> Result<&str, &'static str> {
    if let Some(raw) = literal.strip_prefix('r') {
        let hashes = raw.len() - raw.trim_start_matches('#').len();
        let path = raw
            .get(hashes..raw.len() - hashes)
            .and_then(|quoted| quoted.strip_prefix('"'))
            .and_then(|quoted| quoted.strip_suffix('"'))
            .ok_or("Path must be a string literal")?;
        return Ok(path);
    }
    let path = literal
        .strip_prefix('"')
        .and_then(|quoted| quoted.strip_suffix('"'))
        .ok_or("Path must be a string literal")?;
    if path.contains('\\') {
        return Err("Escape sequences are not supported in paths, use a raw string instead");
    }
    Ok(path)
}
