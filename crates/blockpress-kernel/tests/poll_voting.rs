//! End-to-end poll voting against both store implementations.

use std::sync::Arc;

use blockpress_kernel::{
    ErrorKind, MemoryPollStore, PollEngine, PollError, PollStore, SqlitePollStore,
};
use blockpress_types::{OptionId, Poll, PollChoice, PollId};

fn engines() -> Vec<(&'static str, PollEngine)> {
    let sqlite: Arc<dyn PollStore> = Arc::new(SqlitePollStore::in_memory().unwrap());
    let memory: Arc<dyn PollStore> = Arc::new(MemoryPollStore::new());
    vec![
        ("sqlite", PollEngine::new(sqlite)),
        ("memory", PollEngine::new(memory)),
    ]
}

fn votes(poll: &Poll, option: &str) -> u64 {
    poll.option(&OptionId::from(option)).unwrap().votes
}

fn assert_total_matches(poll: &Poll) {
    let sum: u64 = poll.options().iter().map(|o| o.votes).sum();
    assert_eq!(poll.total_votes(), sum);
}

#[tokio::test]
async fn test_scenario_create_vote_conflict_vote() {
    for (name, engine) in engines() {
        let p1 = PollId::from("p1");
        engine
            .upsert_and_reset_votes(
                &p1,
                "Do you like it?",
                vec![PollChoice::new("a", "Yes"), PollChoice::new("b", "No")],
            )
            .await
            .unwrap();

        let poll = engine
            .vote(&p1, &OptionId::from("a"), "f1", Some("192.0.2.1"))
            .await
            .unwrap();
        assert_eq!(votes(&poll, "a"), 1, "{name}");
        assert_eq!(poll.total_votes(), 1, "{name}");

        let err = engine
            .vote(&p1, &OptionId::from("a"), "f1", Some("192.0.2.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::AlreadyVoted(_)), "{name}: {err}");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let poll = engine.get(&p1).await.unwrap();
        assert_eq!(votes(&poll, "a"), 1, "{name}");
        assert_eq!(poll.total_votes(), 1, "{name}");

        let poll = engine
            .vote(&p1, &OptionId::from("b"), "f2", None)
            .await
            .unwrap();
        assert_eq!(votes(&poll, "b"), 1, "{name}");
        assert_eq!(poll.total_votes(), 2, "{name}");
        assert_total_matches(&poll);

        let voters = engine.voters(&p1).await.unwrap();
        let fingerprints: Vec<_> = voters.iter().map(|v| v.voter_fingerprint.as_str()).collect();
        assert_eq!(fingerprints, vec!["f1", "f2"], "{name}");
        assert_eq!(voters[0].voter_ip.as_deref(), Some("192.0.2.1"));
    }
}

#[tokio::test]
async fn test_unknown_option_leaves_counters_unchanged() {
    for (name, engine) in engines() {
        let p = PollId::from("p");
        engine
            .upsert_and_reset_votes(&p, "Pick", vec![PollChoice::new("x", "X")])
            .await
            .unwrap();
        engine.vote(&p, &OptionId::from("x"), "f1", None).await.unwrap();

        let err = engine
            .vote(&p, &OptionId::from("nope"), "f2", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::UnknownOption { .. }), "{name}");

        let poll = engine.get(&p).await.unwrap();
        assert_eq!(poll.total_votes(), 1, "{name}");
        assert_eq!(votes(&poll, "x"), 1, "{name}");
        assert_eq!(engine.voters(&p).await.unwrap().len(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_vote_on_missing_poll_is_not_found() {
    for (name, engine) in engines() {
        let err = engine
            .vote(&PollId::from("ghost"), &OptionId::from("a"), "f1", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound, "{name}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_are_not_lost() {
    for (name, engine) in engines() {
        let p = PollId::from("busy");
        engine
            .upsert_and_reset_votes(
                &p,
                "Busy?",
                vec![PollChoice::new("a", "A"), PollChoice::new("b", "B")],
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..64 {
            let engine = engine.clone();
            let p = p.clone();
            handles.push(tokio::spawn(async move {
                let option = OptionId::from(if i % 2 == 0 { "a" } else { "b" });
                let fingerprint = format!("voter-{i}");
                engine.vote(&p, &option, &fingerprint, None).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let poll = engine.get(&p).await.unwrap();
        assert_eq!(poll.total_votes(), 64, "{name}");
        assert_eq!(votes(&poll, "a"), 32, "{name}");
        assert_total_matches(&poll);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_votes_count_once() {
    for (name, engine) in engines() {
        let p = PollId::from("dup");
        engine
            .upsert_and_reset_votes(&p, "Once?", vec![PollChoice::new("a", "A")])
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let engine = engine.clone();
            let p = p.clone();
            handles.push(tokio::spawn(async move {
                engine.vote(&p, &OptionId::from("a"), "same-visitor", None).await
            }));
        }
        let mut ok = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(PollError::AlreadyVoted(_)) => conflicts += 1,
                Err(e) => panic!("{name}: unexpected error {e}"),
            }
        }
        assert_eq!(ok, 1, "{name}");
        assert_eq!(conflicts, 15, "{name}");
        assert_eq!(engine.get(&p).await.unwrap().total_votes(), 1, "{name}");
    }
}

#[tokio::test]
async fn test_upsert_resets_counts_but_remembers_voters() {
    for (name, engine) in engines() {
        let p = PollId::from("p");
        let choices = vec![PollChoice::new("a", "A"), PollChoice::new("b", "B")];
        engine.upsert_and_reset_votes(&p, "Q1", choices.clone()).await.unwrap();
        engine.vote(&p, &OptionId::from("a"), "f1", None).await.unwrap();

        let poll = engine.upsert_and_reset_votes(&p, "Q2", choices).await.unwrap();
        assert_eq!(poll.question(), "Q2", "{name}");
        assert_eq!(poll.total_votes(), 0, "{name}");

        let err = engine
            .vote(&p, &OptionId::from("b"), "f1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::AlreadyVoted(_)), "{name}: {err}");
        assert_eq!(engine.get(&p).await.unwrap().total_votes(), 0, "{name}");
        assert_eq!(engine.voters(&p).await.unwrap().len(), 1, "{name}");

        let poll = engine.vote(&p, &OptionId::from("b"), "f2", None).await.unwrap();
        assert_eq!(votes(&poll, "b"), 1, "{name}");
        assert_total_matches(&poll);
    }
}
