//! Channel membership, privileges and directory listings

mod common;

use common::{test_config, Harness};
use ircrelay_core::config::OperatorConfig;

#[tokio::test]
async fn test_join_creates_channel_and_lists_creator() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");

    harness.send(&alice, "JOIN #test");
    assert_eq!(
        alice.drain(),
        vec![
            ":alice!alice@198.51.100.7 JOIN #test",
            ":irc.test 331 alice #test :No topic is set.",
            ":irc.test 353 alice @ #test @alice",
            ":irc.test 366 alice #test :End of /NAMES list.",
        ]
    );
}

#[tokio::test]
async fn test_second_join_and_kick_rights() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");

    harness.send(&alice, "JOIN #test");
    alice.drain();
    harness.send(&bob, "JOIN #test");

    let join = ":bob!bob@198.51.100.7 JOIN #test".to_string();
    assert_eq!(alice.drain(), vec![join.clone()]);
    let bob_lines = bob.drain();
    assert_eq!(bob_lines.iter().filter(|line| **line == join).count(), 1);
    assert!(bob_lines.contains(&":irc.test 353 bob @ #test :@alice bob".to_string()));

    harness.send(&bob, "KICK #test alice :bye");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 482 bob #test :You're not channel operator"]
    );
    assert!(alice.drain().is_empty());
    let channel = harness.server.registry().find_channel("#test").unwrap();
    assert_eq!(channel.lock().member_count(), 2);

    harness.send(&alice, "KICK #test bob :bye");
    let kick = vec![":alice!alice@198.51.100.7 KICK #test bob :bye".to_string()];
    assert_eq!(alice.drain(), kick);
    assert_eq!(bob.drain(), kick);
    assert!(!channel.lock().is_member(&bob.id));
    assert!(harness.server.user(&bob.id).unwrap().channels.is_empty());
}

#[tokio::test]
async fn test_kick_error_numerics() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let _bob = harness.register("bob");

    harness.send(&alice, "KICK #nowhere bob");
    assert_eq!(alice.drain(), vec![":irc.test 403 alice #nowhere :No such channel"]);

    harness.send(&alice, "JOIN #test");
    alice.drain();
    harness.send(&alice, "KICK #test ghost");
    assert_eq!(alice.drain(), vec![":irc.test 401 alice ghost :No such nick/channel"]);

    harness.send(&alice, "KICK #test bob");
    assert_eq!(
        alice.drain(),
        vec![":irc.test 441 alice bob #test :They aren't on that channel"]
    );
}

#[tokio::test]
async fn test_last_part_destroys_channel() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");

    harness.send(&alice, "JOIN #life");
    harness.send(&alice, "TOPIC #life :Old news");
    harness.send(&alice, "MODE #life +kb sekrit *!*@spam.example");
    alice.drain();

    harness.send(&alice, "PART #life");
    assert_eq!(alice.drain(), vec![":alice!alice@198.51.100.7 PART #life Leaving"]);
    assert!(harness.server.registry().find_channel("#LIFE").is_none());

    harness.send(&alice, "JOIN #life");
    let handle = harness.server.registry().find_channel("#life").unwrap();
    let channel = handle.lock();
    assert!(channel.topic.is_none());
    assert!(channel.key.is_none());
    assert!(channel.bans.is_empty());
    assert_eq!(channel.modes.iter().collect::<String>(), "ns");
}

#[tokio::test]
async fn test_part_errors() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");

    harness.send(&alice, "PART #test");
    assert_eq!(alice.drain(), vec![":irc.test 403 alice #test :No such channel"]);

    harness.send(&bob, "JOIN #test");
    harness.send(&alice, "PART #test");
    assert_eq!(
        alice.drain(),
        vec![":irc.test 442 alice #test :You're not on that channel"]
    );
}

#[tokio::test]
async fn test_join_zero_parts_everything() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");

    harness.send(&alice, "JOIN #a,#b");
    alice.drain();
    harness.send(&alice, "JOIN 0");

    let parts: Vec<String> = alice.drain();
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|line| line.contains(" PART #")));
    assert_eq!(harness.server.registry().channel_count(), 0);
}

#[tokio::test]
async fn test_join_admission_checks() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");

    harness.send(&bob, "JOIN bad");
    assert_eq!(bob.drain(), vec![":irc.test 403 bob bad :No such channel"]);

    harness.send(&alice, "JOIN #club");
    harness.send(&alice, "MODE #club +i");
    alice.drain();

    harness.send(&bob, "JOIN #club");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 473 bob #club :Cannot join channel (+i)"]
    );

    harness.send(&alice, "INVITE bob #club");
    assert_eq!(alice.drain(), vec![":irc.test 341 alice bob #club"]);
    assert_eq!(bob.drain(), vec![":alice!alice@198.51.100.7 INVITE bob #club"]);

    harness.send(&alice, "MODE #club +k sekrit");
    alice.drain();
    harness.send(&bob, "JOIN #club wrong");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 475 bob #club :Cannot join channel (+k)"]
    );
    harness.send(&bob, "JOIN #club sekrit");
    assert_eq!(bob.drain()[0], ":bob!bob@198.51.100.7 JOIN #club");

    harness.send(&bob, "PART #club");
    harness.send(&alice, "MODE #club -i+b *!*@198.51.100.7");
    alice.drain();
    harness.send(&bob, "JOIN #club sekrit");
    assert_eq!(
        bob.drain(),
        vec![
            ":bob!bob@198.51.100.7 PART #club Leaving",
            ":irc.test 474 bob #club :Cannot join channel (+b)",
        ]
    );
}

#[tokio::test]
async fn test_channel_ceiling() {
    let mut config = test_config();
    config.limits.max_channels_per_client = 2;
    let harness = Harness::with_config(config);
    let mut alice = harness.register("alice");

    harness.send(&alice, "JOIN #one,#two");
    alice.drain();
    harness.send(&alice, "JOIN #three");
    assert_eq!(
        alice.drain(),
        vec![":irc.test 405 alice #three :You have joined too many channels"]
    );
    assert!(harness.server.registry().find_channel("#three").is_none());
}

#[tokio::test]
async fn test_topic_rules() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");

    harness.send(&alice, "JOIN #test");
    harness.send(&bob, "JOIN #test");
    alice.drain();
    bob.drain();

    harness.send(&bob, "TOPIC #test :anyone may set this");
    let change = ":bob!bob@198.51.100.7 TOPIC #test :anyone may set this".to_string();
    assert_eq!(bob.drain(), vec![change.clone()]);
    assert_eq!(alice.drain(), vec![change]);

    harness.send(&alice, "MODE #test +t");
    alice.drain();
    bob.drain();
    harness.send(&bob, "TOPIC #test :not any more");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 482 bob #test :You're not channel operator"]
    );

    harness.send(&bob, "TOPIC #test");
    let lines = bob.drain();
    assert_eq!(lines[0], ":irc.test 332 bob #test :anyone may set this");
    assert!(lines[1].starts_with(":irc.test 333 bob #test bob "));
}

#[tokio::test]
async fn test_names_hides_invisible_users_from_outsiders() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");
    let mut carol = harness.register("carol");

    harness.send(&alice, "JOIN #open");
    harness.send(&alice, "MODE #open -s");
    harness.send(&bob, "MODE bob -i");
    harness.send(&bob, "JOIN #open");
    alice.drain();
    bob.drain();

    harness.send(&carol, "NAMES #open");
    assert_eq!(
        carol.drain(),
        vec![
            ":irc.test 353 carol = #open bob",
            ":irc.test 366 carol #open :End of /NAMES list.",
        ]
    );
}

#[tokio::test]
async fn test_list_hides_secret_channels() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");
    let mut carol = harness.register("carol");

    harness.send(&alice, "JOIN #secret");
    harness.send(&bob, "JOIN #open");
    harness.send(&bob, "TOPIC #open :all welcome");
    harness.send(&bob, "MODE #open -s");
    alice.drain();
    bob.drain();

    harness.send(&carol, "LIST");
    assert_eq!(
        carol.drain(),
        vec![
            ":irc.test 321 carol Channel :Users  Name",
            ":irc.test 322 carol #open 1 :[+n] all welcome",
            ":irc.test 323 carol :End of /LIST",
        ]
    );

    harness.send(&alice, "LIST >0");
    let lines = alice.drain();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().any(|line| line.contains(" 322 alice #secret 1 ")));
}

#[tokio::test]
async fn test_who_filters_invisible_users() {
    let harness = Harness::new();
    let _alice = harness.register("alice");
    let mut bob = harness.register("bob");
    let mut carol = harness.register("carol");

    harness.send(&bob, "MODE bob -i");
    bob.drain();

    harness.send(&carol, "WHO *");
    let lines = carol.drain();
    assert!(lines.contains(
        &":irc.test 352 carol * bob 198.51.100.7 irc.test bob H :0 bob Example".to_string()
    ));
    assert!(lines.iter().any(|line| line.contains(" carol H? :0 ")));
    assert!(!lines.iter().any(|line| line.contains(" alice ")));
    assert_eq!(lines.last().unwrap(), ":irc.test 315 carol * :End of /WHO list.");
}

#[tokio::test]
async fn test_who_flags_follow_personal_modes() {
    let mut config = test_config();
    config.operators = vec![OperatorConfig::new("admin", "secret")];
    let harness = Harness::with_config(config);
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");
    let mut carol = harness.register("carol");

    harness.send(&alice, "OPER admin secret");
    harness.send(&alice, "MODE alice +H");
    harness.send(&bob, "MODE bob -i+B");
    harness.send(&carol, "OPER admin secret");
    for client in [&alice, &bob, &carol] {
        harness.send(client, "JOIN #room");
    }
    alice.drain();
    bob.drain();
    carol.drain();

    harness.send(&bob, "WHO #room");
    assert_eq!(
        bob.drain(),
        vec![
            ":irc.test 352 bob #room alice 198.51.100.7 irc.test alice H@? :0 alice Example",
            ":irc.test 352 bob #room bob 198.51.100.7 irc.test bob HB :0 bob Example",
            ":irc.test 352 bob #room carol 198.51.100.7 irc.test carol H*? :0 carol Example",
            ":irc.test 315 bob #room :End of /WHO list.",
        ]
    );

    harness.send(&carol, "WHO #room o");
    assert_eq!(
        carol.drain(),
        vec![
            ":irc.test 352 carol #room alice 198.51.100.7 irc.test alice H*!@? :0 alice Example",
            ":irc.test 352 carol #room carol 198.51.100.7 irc.test carol H*? :0 carol Example",
            ":irc.test 315 carol #room :End of /WHO list.",
        ]
    );
}
