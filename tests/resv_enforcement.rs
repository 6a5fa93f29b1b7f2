// tests/resv_enforcement.rs
//! Integration tests for parting local members out of newly reserved
//! channels.

mod common;
use common::{Harness, member};
use slircd_resv::resv::{LocalMember, NoticeScope, ServerCap};

const PEERS: &[(&str, &str, &[ServerCap])] = &[
    ("1", "hub.example.net", &[ServerCap::Encap, ServerCap::Ts6]),
    ("2", "old.example.net", &[ServerCap::Cluster]),
];

fn populate(h: &Harness, channel: &str) {
    h.channels.join(channel, member("00AAAAAAB", "dave"));
    h.channels.join(channel, member("00AAAAAAC", "erin"));
    h.channels.join(channel, member("00AAAAAAD", "frank"));
}

#[tokio::test]
async fn permanent_resv_parts_every_member() {
    let mut h = Harness::new("", PEERS);
    populate(&h, "#spam");

    h.resv(&["#spam", "no spam"]).await;

    assert!(h.channels.members("#spam").is_empty());
    assert_eq!(
        h.channels.parts(),
        vec![
            ":dave!dave@user.example.org PART #spam :dave",
            ":erin!erin@user.example.org PART #spam :erin",
            ":frank!frank@user.example.org PART #spam :frank",
        ]
    );

    for nick in ["dave", "erin", "frank"] {
        assert_eq!(
            h.notifier.user_notices(nick),
            vec!["*** Channel #spam is no longer available on this server."]
        );
    }

    assert_eq!(
        h.drain("1"),
        vec![
            ":00AAAAAAB PART #spam",
            ":00AAAAAAC PART #spam",
            ":00AAAAAAD PART #spam",
        ]
    );
    // Not a TS6 link.
    assert!(h.drain("2").is_empty());

    let forced: Vec<_> = h
        .notifier
        .oper_notices()
        .into_iter()
        .filter(|(_, text)| text.starts_with("Forced PART"))
        .collect();
    assert_eq!(forced.len(), 3);
    assert_eq!(
        forced[0],
        (
            NoticeScope::Local,
            "Forced PART for dave!dave@user.example.org from #spam (no spam)".to_string()
        )
    );
}

#[tokio::test]
async fn temporary_resv_uses_temporary_notice() {
    let h = Harness::standalone();
    h.channels.join("#spam", member("00AAAAAAB", "dave"));

    h.resv(&["15", "#spam", "cool down"]).await;

    assert_eq!(
        h.notifier.user_notices("dave"),
        vec!["*** Channel #spam is temporarily unavailable on this server."]
    );
}

#[tokio::test]
async fn exempt_members_stay() {
    let h = Harness::standalone();
    h.channels.join("#spam", member("00AAAAAAB", "dave"));
    h.channels.join(
        "#spam",
        LocalMember {
            exempt: true,
            ..member("00AAAAAAS", "services")
        },
    );

    h.resv(&["#spam", "no spam"]).await;

    assert_eq!(h.channels.members("#spam"), vec!["services"]);
    assert!(h.notifier.user_notices("services").is_empty());
}

#[tokio::test]
async fn local_channels_are_not_announced() {
    let mut h = Harness::new("", PEERS);
    h.channels.join("&ops", member("00AAAAAAB", "dave"));

    h.resv(&["&ops", "closed"]).await;

    assert!(h.channels.members("&ops").is_empty());
    assert_eq!(h.channels.parts().len(), 1);
    assert!(h.drain("1").is_empty());
}

#[tokio::test]
async fn forcepart_can_be_disabled() {
    let h = Harness::new("forcepart = false", &[]);
    populate(&h, "#spam");

    h.resv(&["#spam", "no spam"]).await;

    assert!(h.service.find_channel("#spam").await.is_some());
    assert_eq!(h.channels.members("#spam").len(), 3);
    assert!(h.channels.parts().is_empty());
}

#[tokio::test]
async fn nick_resv_parts_nobody() {
    let h = Harness::standalone();
    populate(&h, "#spam");

    h.resv(&["dave*", "nick"]).await;

    assert_eq!(h.channels.members("#spam").len(), 3);
}

#[tokio::test]
async fn rejected_resv_parts_nobody() {
    let h = Harness::standalone();
    populate(&h, "#spam");

    h.resv(&["#spam", "bad \"reason\""]).await;

    assert_eq!(h.channels.members("#spam").len(), 3);
    assert!(h.service.find_channel("#spam").await.is_none());
}
