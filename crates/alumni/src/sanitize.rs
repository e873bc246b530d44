//! Helpers for sanitizing user input before it reaches SQL patterns or
//! tracing span attributes.

/// Escapes `LIKE` wildcards so user text matches literally.
///
/// Pair the result with `ESCAPE '\'` in the SQL.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Masks the local part of an email address for logs.
///
/// - `ada@example.com` → `a***@example.com`
/// - `not-an-email` → `***`
pub fn redact_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().unwrap_or('*');
            format!("{}***@{}", first, domain)
        }
        _ => "***".to_string(),
    }
}

/// Keeps only the final path component of an uploaded file name.
pub fn file_name_only(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
