//! Main-site resolution.

use crate::model::{Site, SiteId};

/// Pick the network's main tenant.
///
/// The root-path site with the lowest id wins; without a root-path site the
/// lowest id wins; an empty directory falls back to id 1.
pub fn resolve_main_site(sites: &[Site]) -> SiteId {
    sites
        .iter()
        .filter(|site| site.is_root())
        .map(|site| site.id)
        .min()
        .or_else(|| sites.iter().map(|site| site.id).min())
        .unwrap_or(SiteId::PRIMARY)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn site(id: u64, path: &str) -> Site {
        Site::new(SiteId::new(id).unwrap(), "example.com", path)
    }

    #[test]
    fn empty_directory_defaults_to_one() {
        assert_eq!(resolve_main_site(&[]), SiteId::PRIMARY);
    }

    #[test]
    fn root_path_wins_over_lower_id() {
        let sites = [site(2, "/shop/"), site(5, "/")];
        assert_eq!(resolve_main_site(&sites).get(), 5);
    }

    #[test]
    fn root_ties_break_on_lowest_id() {
        let sites = [site(7, "/"), site(3, "/"), site(4, "/blog/")];
        assert_eq!(resolve_main_site(&sites).get(), 3);
    }

    #[test]
    fn lowest_id_without_root() {
        let sites = [site(9, "/a/"), site(4, "/b/"), site(6, "/c/")];
        assert_eq!(resolve_main_site(&sites).get(), 4);
    }

    #[test]
    fn result_is_a_member_and_stable() {
        let sites = [site(3, "/x/"), site(8, "/"), site(2, "/y/")];
        let first = resolve_main_site(&sites);
        for _ in 0..10 {
            assert_eq!(resolve_main_site(&sites), first);
        }
        assert!(sites.iter().any(|s| s.id == first));
    }
}
