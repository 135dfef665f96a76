//! Qualified function symbols.
//!
//! A qualified symbol names a function together with the package that
//! defines it, for example `app/net.Conn.handle` or
//! `app/net.(Conn as core::fmt::Display).fmt`. Package path components are
//! separated by `/`, and the first `.` after the last `/` ends the package
//! path. Literal dots inside package components are escaped as `%2e` so that
//! rule holds.
//!
//! Demangled Rust paths are converted into this form by [`qualify`] and
//! split back apart with [`split_function_path`].

use std::borrow::Cow;

/// Split a qualified function symbol into its package path and function name.
///
/// The package path keeps its trailing `.` and has `%XX` escapes decoded.
/// A symbol without any package qualifier is returned unchanged as the
/// function name with an empty package path.
///
/// ```
/// use panictrace::split_function_path;
///
/// let (package, function) = split_function_path("github.com/x/y.(*T).Method");
/// assert_eq!(package, "github.com/x/y.");
/// assert_eq!(function, "(*T).Method");
///
/// let (package, function) = split_function_path("example.com/a%2eb.Run");
/// assert_eq!(package, "example.com/a.b.");
/// assert_eq!(function, "Run");
///
/// assert_eq!(split_function_path("main"), ("".into(), "main"));
/// ```
#[must_use]
pub fn split_function_path(function_path: &str) -> (Cow<'_, str>, &str) {
    if function_path.is_empty() {
        return (Cow::Borrowed(""), "");
    }
    // Parenthesized receivers may themselves contain package-like text, so
    // they take priority over the slash rule.
    if let Some(sep) = function_path.find(".(") {
        let (package, function) = function_path.split_at(sep + 1);
        return (unescape(package), function);
    }
    let offset = function_path.rfind('/').map_or(1, |sep| sep + 1);
    let dot = function_path.as_bytes()[offset..]
        .iter()
        .position(|&b| b == b'.');
    match dot {
        Some(sep) => {
            let (package, function) = function_path.split_at(offset + sep + 1);
            (unescape(package), function)
        }
        None => (Cow::Borrowed(""), function_path),
    }
}

/// Decode `%XX` escapes.
///
/// A `%` that is not followed by two hexadecimal digits is kept literally.
/// Borrows the input when it contains no `%`.
#[must_use]
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('%') {
        return Cow::Borrowed(s);
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (hex(bytes.get(i + 1)), hex(bytes.get(i + 2)))
        {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(decoded) => Cow::Owned(decoded),
        Err(err) => Cow::Owned(String::from_utf8_lossy(err.as_bytes()).into_owned()),
    }
}

fn hex(b: Option<&u8>) -> Option<u8> {
    let digit = char::from(*b?).to_digit(16)?;
    u8::try_from(digit).ok()
}

/// Convert a demangled Rust path into a qualified function symbol.
///
/// Module components become the `/`-separated package path and the item
/// path (type, function, closures) follows the first `.`. Trait and
/// inherent receivers written as `<Type as Trait>::f` keep the
/// parenthesized receiver form. Symbols with a single component, such as
/// platform entry points, are returned unchanged.
///
/// ```
/// use panictrace::symbol::qualify;
///
/// assert_eq!(qualify("app::net::Conn::handle"), "app/net.Conn.handle");
/// assert_eq!(qualify("app::worker::run::{{closure}}"), "app/worker.run.{{closure}}");
/// assert_eq!(
///     qualify("<app::net::Conn as core::fmt::Display>::fmt"),
///     "app/net.(Conn as core::fmt::Display).fmt"
/// );
/// assert_eq!(qualify("__libc_start_main"), "__libc_start_main");
/// ```
#[must_use]
pub fn qualify(symbol: &str) -> String {
    let mut components = split_path(symbol);
    if components.len() > 1 && components.last().is_some_and(|c| is_hash(c)) {
        components.pop();
    }
    // Turbofish components (`::<T>`) carry no location information.
    let first = components.first().copied();
    let mut rest: Vec<&str> = components
        .iter()
        .skip(1)
        .copied()
        .filter(|c| !is_turbofish(c))
        .collect();
    let Some(first) = first else {
        return symbol.to_owned();
    };

    if let Some(receiver) = first.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
        return qualify_receiver(receiver, &rest);
    }
    if rest.is_empty() {
        return first.to_owned();
    }

    rest.insert(0, first);
    let start = item_start(&rest);
    let mut out = package_path(&rest[..start]);
    out.push('.');
    out.push_str(&rest[start..].join("."));
    out
}

fn qualify_receiver(receiver: &str, items: &[&str]) -> String {
    let (self_ty, trait_path) = match split_as(receiver) {
        Some((self_ty, trait_path)) => (self_ty, Some(trait_path)),
        None => (receiver, None),
    };
    let (modules, ty) = module_prefix(self_ty);
    let modules = if modules.is_empty() {
        trait_path.map(module_prefix).map(|(m, _)| m).unwrap_or_default()
    } else {
        modules
    };

    let mut out = String::new();
    if !modules.is_empty() {
        out.push_str(&package_path(&modules));
        out.push('.');
    }
    out.push('(');
    out.push_str(ty);
    if let Some(trait_path) = trait_path {
        out.push_str(" as ");
        out.push_str(trait_path);
    }
    out.push(')');
    for item in items {
        out.push('.');
        out.push_str(item);
    }
    out
}

/// Index of the first component that belongs to the item path.
///
/// Modules are snake case by convention, so the first component that starts
/// with an uppercase letter or an `<impl ..>` block starts the item path.
/// Closures stay attached to the function that encloses them.
fn item_start(components: &[&str]) -> usize {
    for (i, component) in components.iter().enumerate().skip(1) {
        if component.starts_with("{{") {
            return (i - 1).max(1);
        }
        if component.starts_with('<') || component.starts_with(|c: char| c.is_ascii_uppercase()) {
            return i;
        }
    }
    components.len() - 1
}

fn package_path(modules: &[&str]) -> String {
    let mut out = String::new();
    for (i, module) in modules.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        out.push_str(&module.replace('.', "%2e"));
    }
    out
}

/// Split a type path into its leading module components and the remainder.
fn module_prefix(path: &str) -> (Vec<&str>, &str) {
    let components = split_path(path);
    let mut modules = Vec::new();
    let mut consumed = 0;
    for component in &components[..components.len().saturating_sub(1)] {
        // Types such as `fn() -> a::B` or `&a::B` hold paths without being one.
        if !component.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
            || !component.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            break;
        }
        modules.push(*component);
        consumed += component.len() + 2;
    }
    (modules, &path[consumed..])
}

/// Split on `::` outside of generic brackets.
fn split_path(path: &str) -> Vec<&str> {
    let bytes = path.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            // `->` inside a function pointer type
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                parts.push(&path[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&path[start..]);
    parts
}

/// Split `Type as Trait` at the top-level ` as `.
fn split_as(receiver: &str) -> Option<(&str, &str)> {
    let bytes = receiver.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'-' => {}
            b'>' => depth = depth.saturating_sub(1),
            b' ' if depth == 0 && receiver[i..].starts_with(" as ") => {
                return Some((&receiver[..i], &receiver[i + 4..]));
            }
            _ => {}
        }
    }
    None
}

fn is_turbofish(component: &str) -> bool {
    component.starts_with('<') && !component.starts_with("<impl ")
}

fn is_hash(component: &str) -> bool {
    component.len() == 17
        && component.starts_with('h')
        && component[1..].bytes().all(|b| b.is_ascii_hexdigit())
}
