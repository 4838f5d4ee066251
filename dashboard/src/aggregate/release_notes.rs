//! Links sprints to their release-notes wiki pages.
//!
//! The wiki has no structured reference to sprints, so pages are matched by
//! name: a page belongs to a sprint when its decoded path contains the sprint
//! name, ignoring case and spaces. The first page in wiki order wins.

use azure_client::models::WikiPage;

const EXCLUDED_PAGE_MARKER: &str = "hotfix";

/// All pages below `root`, minus hotfix pages, in wiki `order`.
pub fn release_note_pages(root: WikiPage) -> Vec<WikiPage> {
    let mut pages = Vec::new();
    flatten_into(root.sub_pages, &mut pages);

    pages.retain(|page| {
        !page
            .path
            .to_lowercase()
            .contains(EXCLUDED_PAGE_MARKER)
    });
    pages.sort_by_key(|page| page.order.unwrap_or(i64::MAX));
    pages
}

fn flatten_into(pages: Vec<WikiPage>, out: &mut Vec<WikiPage>) {
    for mut page in pages {
        let children = std::mem::take(&mut page.sub_pages);
        out.push(page);
        flatten_into(children, out);
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn page_link(page: &WikiPage) -> Option<&str> {
    page.remote_url.as_deref().or(page.url.as_deref())
}

fn decoded_path(page: &WikiPage) -> String {
    urlencoding::decode(&page.path)
        .map(|path| path.into_owned())
        .unwrap_or_else(|_| page.path.clone())
}

/// Strip the last path segment: `.../Release-Notes/Sprint-1` -> `.../Release-Notes`.
fn parent_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, _)) if !parent.ends_with('/') => parent.to_string(),
        _ => trimmed.to_string(),
    }
}

/// For each name, the link of the first page whose path contains it.
///
/// When no name matches any page at all, every name gets the parent of the
/// first page's link instead, which points at the release-notes section.
pub fn link_release_notes(names: &[&str], pages: &[WikiPage]) -> Vec<Option<String>> {
    let paths: Vec<String> = pages.iter().map(|page| normalize(&decoded_path(page))).collect();

    let links: Vec<Option<String>> = names
        .iter()
        .map(|name| {
            let needle = normalize(name);
            if needle.is_empty() {
                return None;
            }
            pages
                .iter()
                .zip(&paths)
                .find(|(_, path)| path.contains(&needle))
                .and_then(|(page, _)| page_link(page))
                .map(String::from)
        })
        .collect();

    if links.iter().any(Option::is_some) {
        return links;
    }

    let fallback = pages.first().and_then(page_link).map(parent_url);
    names.iter().map(|_| fallback.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wiki() -> WikiPage {
        serde_json::from_value(json!({
            "path": "/Release Notes",
            "order": 0,
            "remoteUrl": "https://wiki/Release-Notes",
            "subPages": [
                {
                    "path": "/Release Notes/Sprint%2012",
                    "order": 2,
                    "remoteUrl": "https://wiki/Release-Notes/Sprint-12"
                },
                {
                    "path": "/Release Notes/Hotfix Sprint 11",
                    "order": 0,
                    "remoteUrl": "https://wiki/Release-Notes/Hotfix-Sprint-11"
                },
                {
                    "path": "/Release Notes/sprint11",
                    "order": 1,
                    "remoteUrl": "https://wiki/Release-Notes/sprint11",
                    "subPages": [
                        {
                            "path": "/Release Notes/sprint11/Details",
                            "order": 3,
                            "remoteUrl": "https://wiki/Release-Notes/sprint11/Details"
                        }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_pages_are_flattened_filtered_and_sorted() {
        let pages = release_note_pages(wiki());
        let paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "/Release Notes/sprint11",
                "/Release Notes/Sprint%2012",
                "/Release Notes/sprint11/Details"
            ]
        );
    }

    #[test]
    fn test_match_ignores_case_and_spaces() {
        let pages = release_note_pages(wiki());
        let links = link_release_notes(&["Sprint 11", "Sprint 12", "Sprint 13"], &pages);
        assert_eq!(
            links,
            vec![
                Some("https://wiki/Release-Notes/sprint11".to_string()),
                Some("https://wiki/Release-Notes/Sprint-12".to_string()),
                None
            ]
        );
    }

    #[test]
    fn test_fallback_when_nothing_matches() {
        let pages = release_note_pages(wiki());
        let links = link_release_notes(&["Sprint 20", "Sprint 21"], &pages);
        assert_eq!(
            links,
            vec![
                Some("https://wiki/Release-Notes".to_string()),
                Some("https://wiki/Release-Notes".to_string())
            ]
        );
    }

    #[test]
    fn test_no_pages() {
        assert_eq!(link_release_notes(&["Sprint 1"], &[]), vec![None]);
    }

    #[test]
    fn test_parent_url() {
        assert_eq!(parent_url("https://wiki/a/b"), "https://wiki/a");
        assert_eq!(parent_url("https://wiki/a/b/"), "https://wiki/a");
        assert_eq!(parent_url("https://wiki"), "https://wiki");
    }
}
