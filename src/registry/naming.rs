//! Tool name resolution
//!
//! Clients disagree on whether namespaced tools are spelled `wiki.search`
//! or `wiki_search`, and often drop a proxy prefix (`bing.search` for
//! `proxy.bing.search`). Resolution tries, in order:
//! 1. the exact name
//! 2. the name with dots and underscores swapped
//! 3. the single registered name whose trailing segments match

/// Find the registered name a client meant by `requested`.
pub fn resolve_tool_name<'a, I>(requested: &str, registered: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<&'a str> = registered.into_iter().collect();

    if let Some(name) = names.iter().copied().find(|n| *n == requested) {
        return Some(name);
    }

    let dotted = requested.replace('_', ".");
    let underscored = requested.replace('.', "_");
    if let Some(name) = names
        .iter()
        .copied()
        .find(|n| *n == dotted || *n == underscored)
    {
        return Some(name);
    }

    let suffix = format!(".{}", dotted);
    let mut matches = names
        .iter()
        .copied()
        .filter(|n| n.replace('_', ".").ends_with(&suffix));

    match (matches.next(), matches.next()) {
        (Some(name), None) => Some(name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTERED: &[&str] = &[
        "echo",
        "wiki.search",
        "google_search",
        "proxy.bing.search",
        "some.very.long.namespace.tool",
    ];

    fn resolve(name: &str) -> Option<&'static str> {
        resolve_tool_name(name, REGISTERED.iter().copied())
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(resolve("echo"), Some("echo"));
        assert_eq!(resolve("wiki.search"), Some("wiki.search"));
        assert_eq!(resolve("proxy.bing.search"), Some("proxy.bing.search"));
    }

    #[test]
    fn test_dot_underscore_swap() {
        assert_eq!(resolve("wiki_search"), Some("wiki.search"));
        assert_eq!(resolve("google.search"), Some("google_search"));

        let only_underscore = ["wiki_search"];
        assert_eq!(
            resolve_tool_name("wiki.search", only_underscore.iter().copied()),
            Some("wiki_search")
        );
    }

    #[test]
    fn test_namespace_suffix() {
        assert_eq!(resolve("bing.search"), Some("proxy.bing.search"));
        assert_eq!(resolve("bing_search"), Some("proxy.bing.search"));
        assert_eq!(resolve("namespace.tool"), Some("some.very.long.namespace.tool"));
    }

    #[test]
    fn test_ambiguous_and_unknown() {
        let names = ["a.search", "b.search"];
        assert_eq!(resolve_tool_name("search", names.iter().copied()), None);
        assert_eq!(resolve("missing"), None);
    }
}
