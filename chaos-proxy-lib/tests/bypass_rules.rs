use std::net::IpAddr;

use chaos_proxy_lib::config::BypassRules;
use chaos_proxy_lib::BypassList;

fn list(domains: &[&str], ip_ranges: &[&str]) -> BypassList {
    BypassList::from_rules(BypassRules {
        domains: domains.iter().map(|d| d.to_string()).collect(),
        ip_ranges: ip_ranges.iter().map(|r| r.to_string()).collect(),
        download_mime_types: vec!["application/zip".to_string()],
    })
}

#[test]
fn local_names_always_bypass() {
    let list = list(&[], &[]);
    for host in ["localhost", "127.0.0.1", "0.0.0.0", "::1"] {
        assert!(list.should_bypass_domain(host), "{host}");
    }
    assert!(!list.should_bypass_domain("example.com"));
    assert!(!list.should_bypass_domain(""));
}

#[test]
fn exact_and_suffix_domain_rules() {
    let list = list(&[".ir", "aparat.com"], &[]);

    // leading-dot rule is a pure suffix match
    assert!(list.should_bypass_domain("news.ir"));
    assert!(list.should_bypass_domain("sub.site.ir"));
    assert!(!list.should_bypass_domain("irrelevant.com"));

    // bare rule matches exactly or as a parent domain
    assert!(list.should_bypass_domain("aparat.com"));
    assert!(list.should_bypass_domain("www.aparat.com"));
    assert!(!list.should_bypass_domain("notaparat.com"));

    // case-insensitive
    assert!(list.should_bypass_domain("WWW.APARAT.COM"));
}

#[test]
fn ip_rules_cover_loopback_private_and_cidrs() {
    let list = list(&[], &["203.0.113.0/24"]);

    let cases: &[(&str, bool)] = &[
        ("127.0.0.1", true),
        ("10.1.2.3", true),
        ("172.16.0.1", true),
        ("192.168.1.1", true),
        ("203.0.113.77", true),
        ("203.0.114.1", false),
        ("8.8.8.8", false),
        ("::1", true),
        ("2001:db8::1", false),
    ];
    for (ip, expected) in cases {
        let ip: IpAddr = ip.parse().unwrap();
        assert_eq!(list.should_bypass_ip(ip), *expected, "{ip}");
    }
}

#[test]
fn invalid_cidr_entries_are_skipped() {
    let list = list(&[], &["not-a-cidr", "10.0.0.0/8"]);
    assert!(list.should_bypass_ip("10.9.9.9".parse().unwrap()));
}

#[test]
fn mime_rules_match_without_parameters() {
    let list = list(&[], &[]);
    assert!(list.should_bypass_mime("application/zip"));
    assert!(list.should_bypass_mime("application/zip; charset=binary"));
    assert!(list.should_bypass_mime("APPLICATION/ZIP"));
    assert!(!list.should_bypass_mime("text/html"));
    assert!(!list.should_bypass_mime(""));
}
