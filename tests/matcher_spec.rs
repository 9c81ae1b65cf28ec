use loadout::matcher::{matches, matches_any};
use speculate2::speculate;

speculate! {
    describe "matches" {
        describe "wildcard semantics" {
            it "treats * as zero or more of any character" {
                assert!(matches("https://site.test/page/*", "https://site.test/page/"));
                assert!(matches("https://site.test/page/*", "https://site.test/page/123"));
                assert!(matches("https://site.test/*/edit", "https://site.test/page/123/edit"));
            }

            it "anchors the pattern to the full URL" {
                assert!(!matches("https://site.test/page", "https://site.test/page/123"));
                assert!(!matches("site.test/page/*", "https://site.test/page/123"));
            }

            it "matches the universal pattern against every URL" {
                for url in [
                    "https://site.test/page/123",
                    "http://a.b/",
                    "ftp://files.test/dir/file.txt",
                ] {
                    assert!(matches("*://*/*", url), "expected universal match for {url}");
                }
            }
        }

        describe "robustness" {
            it "is case insensitive" {
                assert!(matches("HTTPS://SITE.TEST/*", "https://site.test/home"));
            }

            it "strips stray whitespace from hand-edited patterns" {
                assert!(matches("https://site.test/create/  *", "https://site.test/create/new"));
            }

            it "treats regex metacharacters as literals" {
                assert!(matches("https://site.test/p?id=1", "https://site.test/p?id=1"));
                assert!(!matches("https://site.test/p.x", "https://site.test/pax"));
            }

            it "never matches an empty pattern" {
                assert!(!matches("", "https://site.test/"));
                assert!(!matches("   ", "https://site.test/"));
            }
        }
    }

    describe "matches_any" {
        it "matches everything when the pattern list is empty" {
            assert!(matches_any(&[], "https://whatever.test/anything"));
        }

        it "matches when any one pattern matches" {
            let patterns = vec![
                "https://a.test/*".to_string(),
                "https://b.test/*".to_string(),
            ];
            assert!(matches_any(&patterns, "https://a.test/x"));
            assert!(matches_any(&patterns, "https://b.test/y"));
            assert!(!matches_any(&patterns, "https://c.test/z"));
        }
    }
}
