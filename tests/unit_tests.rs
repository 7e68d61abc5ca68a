//! Unit tests for pr-phase-monitor modules

mod common;

mod classify_test {
    use crate::common::{
        AGENT, REVIEWER, comment, draft_pr, make_pr, needs_fix_pr, open_thread, ready_pr, review,
        with_reviews,
    };
    use pr_phase_monitor::phase::{BotIdentities, Phase, classify, classify_with_rule};
    use pr_phase_monitor::types::{ReviewEvent, ReviewState, ReviewThread};

    fn bots() -> BotIdentities {
        BotIdentities::default()
    }

    #[test]
    fn test_draft_without_reviewers_is_agent_working() {
        let mut pr = make_pr("acme", "widgets", 1);
        pr.is_draft = true;
        assert_eq!(classify(&pr, &bots()), Phase::AgentWorking);
    }

    #[test]
    fn test_draft_with_reviewers_is_draft() {
        assert_eq!(classify(&draft_pr(1), &bots()), Phase::Draft);
    }

    #[test]
    fn test_changes_requested_by_reviewer_needs_fix() {
        assert_eq!(classify(&needs_fix_pr(1), &bots()), Phase::NeedsFix);
    }

    #[test]
    fn test_reviewer_comment_depends_on_open_threads() {
        let mut pr = ready_pr(1);
        assert_eq!(classify(&pr, &bots()), Phase::ReadyForReview);

        pr.threads = vec![open_thread()];
        assert_eq!(classify(&pr, &bots()), Phase::NeedsFix);
    }

    #[test]
    fn test_resolved_and_outdated_threads_do_not_block() {
        let mut pr = ready_pr(1);
        pr.threads = vec![
            ReviewThread {
                is_resolved: true,
                ..open_thread()
            },
            ReviewThread {
                is_outdated: true,
                ..open_thread()
            },
        ];
        assert_eq!(classify(&pr, &bots()), Phase::ReadyForReview);
    }

    #[test]
    fn test_reacted_comment_wins_over_reviews() {
        let mut pr = needs_fix_pr(1);
        pr.comments = vec![comment(1)];
        assert_eq!(
            classify_with_rule(&pr, &bots()),
            (Phase::AgentWorking, "reacted-comment")
        );

        pr.comments = vec![comment(0)];
        assert_eq!(classify(&pr, &bots()), Phase::NeedsFix);
    }

    #[test]
    fn test_agent_after_changes_requested_still_needs_fix() {
        let pr = with_reviews(
            make_pr("acme", "widgets", 1),
            vec![
                review(REVIEWER, ReviewState::ChangesRequested),
                review(AGENT, ReviewState::Commented),
            ],
        );
        assert_eq!(classify(&pr, &bots()), Phase::NeedsFix);
    }

    #[test]
    fn test_single_agent_pass_with_open_threads_needs_fix() {
        let mut pr = with_reviews(
            make_pr("acme", "widgets", 1),
            vec![
                review(REVIEWER, ReviewState::Commented),
                review(AGENT, ReviewState::Commented),
            ],
        );
        pr.threads = vec![open_thread()];
        assert_eq!(classify(&pr, &bots()), Phase::NeedsFix);

        pr.threads.clear();
        assert_eq!(classify(&pr, &bots()), Phase::ReadyForReview);
    }

    #[test]
    fn test_second_agent_pass_settles_open_threads() {
        let mut pr = with_reviews(
            make_pr("acme", "widgets", 1),
            vec![
                review(REVIEWER, ReviewState::Commented),
                review(AGENT, ReviewState::Commented),
                review(AGENT, ReviewState::Commented),
            ],
        );
        pr.threads = vec![open_thread()];
        assert_eq!(classify(&pr, &bots()), Phase::ReadyForReview);
    }

    #[test]
    fn test_human_review_last_is_agent_working() {
        let pr = with_reviews(
            make_pr("acme", "widgets", 1),
            vec![
                review(REVIEWER, ReviewState::Commented),
                review("maintainer", ReviewState::Approved),
            ],
        );
        assert_eq!(classify(&pr, &bots()), Phase::AgentWorking);
    }

    #[test]
    fn test_custom_bot_identities() {
        let bots = BotIdentities {
            reviewer: vec!["review-robot".to_string()],
            agent: vec!["fix-robot".to_string()],
        };
        let pr = with_reviews(
            make_pr("acme", "widgets", 1),
            vec![review("review-robot[bot]", ReviewState::ChangesRequested)],
        );
        assert_eq!(classify(&pr, &bots), Phase::NeedsFix);
        assert_eq!(classify(&pr, &BotIdentities::default()), Phase::AgentWorking);
    }

    #[test]
    fn test_malformed_snapshots_are_total() {
        // deleted author, odd states, reviews without latest_reviews
        let mut pr = make_pr("acme", "widgets", 1);
        pr.reviews = vec![ReviewEvent {
            author: None,
            state: ReviewState::Other,
            body: None,
        }];
        assert_eq!(classify(&pr, &bots()), Phase::AgentWorking);

        pr.latest_reviews = pr.reviews.clone();
        assert_eq!(classify(&pr, &bots()), Phase::AgentWorking);

        let mut pending = ready_pr(2);
        pending.reviews[0].state = ReviewState::Pending;
        pending.threads = vec![open_thread(); 3];
        assert!(Phase::ALL.contains(&classify(&pending, &bots())));
    }
}

mod ruleset_test {
    use pr_phase_monitor::config::{
        Config, ExecutionFlags, resolve, resolve_strict, validate_repository,
    };
    use pr_phase_monitor::types::RepoRef;

    fn load(doc: &str) -> Config {
        Config::from_toml_str(doc).unwrap()
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let config = load(
            r#"
            enable_execution_phase1_to_phase2 = true

            [[rulesets]]
            repositories = ["all"]
            enable_execution_phase3_send_ntfy = true

            [[rulesets]]
            repositories = ["acme/widgets"]
            enable_execution_phase1_to_phase2 = false
            "#,
        );
        let repo = RepoRef::new("acme", "widgets");
        let first = resolve(&config.global(), &config.rulesets, &repo);
        let second = resolve(&config.global(), &config.rulesets, &repo);
        assert_eq!(first, second);
    }

    #[test]
    fn test_later_rule_overrides_only_its_flags() {
        let config = load(
            r#"
            [[rulesets]]
            repositories = ["all"]
            enable_execution_phase1_to_phase2 = true
            enable_execution_phase2_to_phase3 = true
            enable_execution_phase3_send_ntfy = true

            [[rulesets]]
            repositories = ["widgets"]
            enable_execution_phase2_to_phase3 = false
            "#,
        );
        let effective = resolve(
            &config.global(),
            &config.rulesets,
            &RepoRef::new("acme", "widgets"),
        );
        assert_eq!(
            effective.flags,
            ExecutionFlags {
                mark_ready: true,
                request_fix: false,
                notify: true,
                merge: false,
                assign: false,
            }
        );
    }

    #[test]
    fn test_wildcard_then_specific() {
        let config = load(
            r#"
            [[rulesets]]
            repositories = ["all"]
            enable_execution_phase3_to_merge = true

            [[rulesets]]
            repositories = ["acme/special"]
            enable_execution_phase3_to_merge = false
            "#,
        );
        let global = config.global();
        let other = resolve(&global, &config.rulesets, &RepoRef::new("acme", "plain"));
        let special = resolve(&global, &config.rulesets, &RepoRef::new("acme", "special"));
        assert!(other.flags.merge);
        assert!(!special.flags.merge);
    }

    #[test]
    fn test_merge_enabled_per_repository() {
        let config = load(
            r#"
            [phase3_merge]
            comment = "Merging, thanks!"

            [[rulesets]]
            repositories = ["all"]
            enable_phase3_merge = true

            [[rulesets]]
            repositories = ["r1"]
            enable_phase3_merge = false
            "#,
        );
        let global = config.global();
        let r1 = resolve(&global, &config.rulesets, &RepoRef::new("acme", "r1"));
        let r2 = resolve(&global, &config.rulesets, &RepoRef::new("acme", "r2"));
        assert!(!r1.merge.enabled);
        assert!(r2.merge.enabled);
    }

    #[test]
    fn test_merge_without_comment_is_fatal() {
        let config = load(
            r#"
            [[rulesets]]
            repositories = ["r1"]
            enable_phase3_merge = true
            "#,
        );
        let repo = RepoRef::new("acme", "r1");
        let effective = resolve_strict(&config.global(), &config.rulesets, &repo).unwrap();
        let err = validate_repository(&effective, &repo).unwrap_err();
        assert!(err.is_fatal());

        // other repositories are unaffected
        let other = RepoRef::new("acme", "r2");
        let effective = resolve_strict(&config.global(), &config.rulesets, &other).unwrap();
        assert!(validate_repository(&effective, &other).is_ok());
    }
}

mod config_test {
    use pr_phase_monitor::config::Config;
    use pr_phase_monitor::config::duration::{format_duration, parse_duration};
    use pr_phase_monitor::phase::BotIdentities;
    use std::time::Duration;

    #[test]
    fn test_duration_forms() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("soon").is_err());
        assert_eq!(format_duration(Duration::from_secs(5_400)), "1h 30m");
    }

    #[test]
    fn test_bots_section_overrides_defaults() {
        let config = Config::from_toml_str(
            r#"
            [bots]
            reviewer = ["review-robot"]
            "#,
        )
        .unwrap();
        assert_eq!(config.bots.reviewer, vec!["review-robot".to_string()]);
        assert_eq!(config.bots.agent, BotIdentities::default().agent);
    }

    #[test]
    fn test_empty_ntfy_topic_rejected() {
        let err = Config::from_toml_str(
            r#"
            [ntfy]
            topic = "  "
            "#,
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }
}
