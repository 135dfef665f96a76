//! Properties of symbol path splitting and qualification.

use panictrace::{split_function_path, symbol::qualify};
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case("app/server.(Conn).serve", "app/server.", "(Conn).serve")]
#[case("app/internal%2ev2/db.Open", "app/internal.v2/db.", "Open")]
#[case("app.main", "app.", "main")]
#[case("__libc_start_main", "", "__libc_start_main")]
#[case("", "", "")]
fn splits_qualified_names(#[case] input: &str, #[case] package: &str, #[case] name: &str) {
    let (p, n) = split_function_path(input);
    assert_eq!((&*p, n), (package, name));
}

#[test]
fn qualified_names_split_back_into_module_and_item() {
    let qualified = qualify("my_app::net::server::Conn::serve");
    assert_eq!(qualified, "my_app/net/server.Conn.serve");
    let (package, name) = split_function_path(&qualified);
    assert_eq!(package, "my_app/net/server.");
    assert_eq!(name, "Conn.serve");
}

proptest! {
    #[test]
    fn undotted_names_have_no_package(name in "[A-Za-z_][A-Za-z0-9_]{0,24}") {
        let (package, rest) = split_function_path(&name);
        prop_assert_eq!(&*package, "");
        prop_assert_eq!(rest, name.as_str());
    }

    #[test]
    fn last_path_segment_splits_at_first_dot(
        dirs in prop::collection::vec("[a-z][a-z0-9_]{0,8}", 0..4),
        module in "[a-z][a-z0-9_]{0,8}",
        item in "[A-Za-z][A-Za-z0-9_]{0,8}(\\.[a-z][a-z0-9_]{0,8}){0,2}",
    ) {
        let mut package = dirs.join("/");
        if !package.is_empty() {
            package.push('/');
        }
        package.push_str(&module);
        package.push('.');
        let symbol = format!("{package}{item}");
        let (p, n) = split_function_path(&symbol);
        prop_assert_eq!(&*p, package.as_str());
        prop_assert_eq!(n, item.as_str());
    }

    #[test]
    fn escaped_dots_decode(left in "[a-z]{1,8}", right in "[a-z]{1,8}") {
        let symbol = format!("{left}%2e{right}/pkg.Func");
        let (package, name) = split_function_path(&symbol);
        prop_assert_eq!(package.into_owned(), format!("{left}.{right}/pkg."));
        prop_assert_eq!(name, "Func");
    }
}
