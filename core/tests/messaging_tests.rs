//! PRIVMSG, NOTICE and directory replies

mod common;

use common::{test_config, Harness};

#[tokio::test]
async fn test_channel_message_skips_sender() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");
    harness.send(&alice, "JOIN #test");
    harness.send(&bob, "JOIN #test");
    alice.drain();
    bob.drain();

    harness.send(&alice, "PRIVMSG #TEST :hello there");
    assert!(alice.drain().is_empty());
    assert_eq!(
        bob.drain(),
        vec![":alice!alice@198.51.100.7 PRIVMSG #test :hello there"]
    );
}

#[tokio::test]
async fn test_no_external_and_moderated_channels() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");
    harness.send(&alice, "JOIN #test");
    alice.drain();

    harness.send(&bob, "PRIVMSG #test :from outside");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 404 bob #test :Cannot send to channel"]
    );
    harness.send(&bob, "NOTICE #test :from outside");
    assert!(bob.drain().is_empty());
    assert!(alice.drain().is_empty());

    harness.send(&bob, "JOIN #test");
    harness.send(&alice, "MODE #test +m");
    alice.drain();
    bob.drain();

    harness.send(&bob, "PRIVMSG #test :muted");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 404 bob #test :Cannot send to channel"]
    );

    harness.send(&alice, "MODE #test +v bob");
    alice.drain();
    bob.drain();
    harness.send(&bob, "PRIVMSG #test :voiced");
    assert_eq!(
        alice.drain(),
        vec![":bob!bob@198.51.100.7 PRIVMSG #test :voiced"]
    );
}

#[tokio::test]
async fn test_private_message_and_away_reply() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");

    harness.send(&bob, "AWAY :lunch");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 306 bob :You have been marked as being away"]
    );

    harness.send(&alice, "PRIVMSG Bob :are you there?");
    assert_eq!(
        bob.drain(),
        vec![":alice!alice@198.51.100.7 PRIVMSG bob :are you there?"]
    );
    assert_eq!(alice.drain(), vec![":irc.test 301 alice bob lunch"]);

    harness.send(&alice, "NOTICE bob :no away reply for notices");
    bob.drain();
    assert!(alice.drain().is_empty());

    harness.send(&bob, "AWAY");
    assert_eq!(
        bob.drain(),
        vec![":irc.test 305 bob :You are no longer marked as being away"]
    );
}

#[tokio::test]
async fn test_message_error_numerics() {
    let mut config = test_config();
    config.limits.max_targets = 2;
    let harness = Harness::with_config(config);
    let mut alice = harness.register("alice");

    harness.send(&alice, "PRIVMSG");
    assert_eq!(
        alice.drain(),
        vec![":irc.test 411 alice :No recipient given (PRIVMSG)"]
    );

    harness.send(&alice, "PRIVMSG bob");
    assert_eq!(alice.drain(), vec![":irc.test 412 alice :No text to send"]);

    harness.send(&alice, "NOTICE ghost :boo");
    assert_eq!(
        alice.drain(),
        vec![":irc.test 401 alice ghost :No such nick/channel"]
    );

    harness.send(&alice, "PRIVMSG a,b,c :hi");
    assert_eq!(
        alice.drain(),
        vec![":irc.test 407 alice a,b,c :Too many recipients"]
    );
}

#[tokio::test]
async fn test_whois_reply() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");
    harness.send(&bob, "JOIN #test");
    harness.send(&bob, "MODE #test -s");
    bob.drain();

    harness.send(&alice, "WHOIS bob");
    let lines = alice.drain();
    let codes: Vec<&str> = lines
        .iter()
        .map(|line| line.split(' ').nth(1).unwrap_or(""))
        .collect();
    assert_eq!(codes, vec!["311", "319", "312", "317", "318"]);
    assert_eq!(
        lines[0],
        ":irc.test 311 alice bob bob 198.51.100.7 * :bob Example"
    );
    assert_eq!(lines[1], ":irc.test 319 alice bob @#test");
    assert_eq!(lines[4], ":irc.test 318 alice bob :End of /WHOIS list.");

    harness.send(&alice, "WHOIS ghost");
    assert_eq!(
        alice.drain(),
        vec![
            ":irc.test 401 alice ghost :No such nick/channel",
            ":irc.test 318 alice ghost :End of /WHOIS list.",
        ]
    );
}

#[tokio::test]
async fn test_whois_private_user_lists_shared_channels_only() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let mut bob = harness.register("bob");
    for (client, channel) in [(&bob, "#shared"), (&bob, "#elsewhere"), (&alice, "#shared")] {
        harness.send(client, &format!("JOIN {}", channel));
        harness.send(client, &format!("MODE {} -s", channel));
    }
    harness.send(&bob, "MODE bob +p");
    alice.drain();
    bob.drain();

    harness.send(&alice, "WHOIS bob");
    let lines = alice.drain();
    assert_eq!(lines[1], ":irc.test 319 alice bob @#shared");

    harness.send(&bob, "WHOIS bob");
    let lines = bob.drain();
    let channels = lines
        .iter()
        .find(|line| line.contains(" 319 "))
        .expect("own channels listed");
    assert!(channels.contains("@#shared"));
    assert!(channels.contains("@#elsewhere"));
}

#[tokio::test]
async fn test_userhost_and_version() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let _bob = harness.register("bob");

    harness.send(&alice, "USERHOST bob ghost alice");
    assert_eq!(
        alice.drain(),
        vec![":irc.test 302 alice :bob=+bob@198.51.100.7 alice=+alice@198.51.100.7"]
    );

    harness.send(&alice, "VERSION");
    let lines = alice.drain();
    assert!(lines[0].starts_with(":irc.test 351 alice ircrelay-"));
    assert_eq!(lines.len(), 3);
}

#[tokio::test]
async fn test_lusers_counts_unregistered_connections() {
    let harness = Harness::new();
    let mut alice = harness.register("alice");
    let _pending = harness.connect();

    harness.send(&alice, "LUSERS");
    let lines = alice.drain();
    assert_eq!(lines[0], ":irc.test 251 alice :There are 0 users and 1 invisible on 1 servers");
    assert!(lines.contains(&":irc.test 253 alice 1 :unknown connection(s)".to_string()));
    assert!(lines.contains(&":irc.test 255 alice :I have 2 clients and 0 servers".to_string()));
}
