use std::sync::Arc;
use std::time::Duration;

use course_advisor::advisor::Advisor;
use course_advisor::config::AdvisorConfig;
use course_advisor::db::Database;
use course_advisor::engine::{RuleEvaluator, DEFAULT_RECOMMENDATION};
use course_advisor::error::AdvisorError;
use course_advisor::models::*;
use course_advisor::rules::RuleSet;
use uuid::Uuid;

const RULES: &str = r#"{
    "version": "spec",
    "rules": [
        { "stream": "Physical Science", "interest": "Engineering", "min_gpa": 3.0, "priority": 1, "recommendation": "Engineering Technology" },
        { "stream": "*", "interest": "Design", "min_gpa": 0.0, "priority": 5, "recommendation": "Graphic Design / Multimedia" }
    ]
}"#;

fn rules() -> Arc<RuleSet> {
    Arc::new(RuleSet::load(RULES).expect("Failed to load rules"))
}

fn database() -> Database {
    let db = Database::open_memory().expect("Failed to create database");
    db.migrate().expect("Failed to migrate");
    db
}

fn setup() -> Advisor {
    Advisor::new(database(), rules(), &AdvisorConfig::default())
}

fn register(advisor: &Advisor, username: &str) -> User {
    advisor
        .register_user(CreateUserInput {
            username: username.to_string(),
            role: None,
        })
        .expect("Failed to register")
}

fn submission(stream: &str, interest: &str, gpa: Option<f64>) -> ProfileSubmission {
    ProfileSubmission {
        stream: stream.to_string(),
        interest: interest.to_string(),
        subjects: ["Combined Maths".into(), "Physics".into(), "Chemistry".into()],
        results: ["A".into(), "A".into(), "B".into()],
        gpa,
    }
}

struct SlowEvaluator(Duration);

impl RuleEvaluator for SlowEvaluator {
    fn evaluate(&self, _: &AcademicProfile) -> Result<Option<String>, AdvisorError> {
        std::thread::sleep(self.0);
        Ok(Some("Too late".to_string()))
    }
}

struct BrokenEvaluator;

impl RuleEvaluator for BrokenEvaluator {
    fn evaluate(&self, _: &AcademicProfile) -> Result<Option<String>, AdvisorError> {
        Err(AdvisorError::Computation("backend crashed".to_string()))
    }
}

mod evaluate_and_store {
    use super::*;

    #[tokio::test]
    async fn stores_matching_rule_recommendation() {
        let advisor = setup();
        let student = register(&advisor, "kasun");

        let evaluation = advisor
            .evaluate_and_store(student.id, &submission("Physical Science", "Engineering", Some(3.5)))
            .await
            .expect("Evaluation failed");

        assert_eq!(evaluation.recommendation, "Engineering Technology");
        assert!(evaluation.matched_by_rule);
        assert!(!evaluation.degraded);

        let stored = advisor.get_profile(student.id).unwrap();
        assert_eq!(stored.recommendation.as_deref(), Some("Engineering Technology"));
        assert_eq!(stored.profile.stream, Stream::PhysicalScience);
        assert_eq!(stored.profile.subjects[0], "Combined Maths");
    }

    #[tokio::test]
    async fn stores_default_when_nothing_matches() {
        let advisor = setup();
        let student = register(&advisor, "nimali");

        let evaluation = advisor
            .evaluate_and_store(student.id, &submission("Commerce", "Finance", None))
            .await
            .unwrap();

        assert_eq!(evaluation.recommendation, DEFAULT_RECOMMENDATION);
        assert!(!evaluation.matched_by_rule);

        let stored = advisor.get_profile(student.id).unwrap();
        assert_eq!(stored.profile.gpa, 0.0);
        assert_eq!(stored.recommendation.as_deref(), Some(DEFAULT_RECOMMENDATION));
    }

    #[tokio::test]
    async fn rejects_unknown_interest() {
        let advisor = setup();
        let student = register(&advisor, "arts");

        let err = advisor
            .evaluate_and_store(student.id, &submission("Arts", "UnknownXYZ", Some(3.0)))
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::Validation(_)));
        assert!(advisor.database().get_profile(student.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_student_fails_on_persistence_step() {
        let advisor = setup();
        let submission = submission("Physical Science", "Engineering", Some(3.5));

        // The pure decision succeeds on its own.
        let preview = advisor.preview(&submission).await.unwrap();
        assert!(preview.matched_by_rule);

        let err = advisor
            .evaluate_and_store(Uuid::new_v4(), &submission)
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::NotFound(_)));
    }

    #[tokio::test]
    async fn resubmission_updates_single_record() {
        let advisor = setup();
        let student = register(&advisor, "amaya");

        advisor
            .evaluate_and_store(student.id, &submission("Physical Science", "Engineering", Some(3.5)))
            .await
            .unwrap();
        let first = advisor.get_profile(student.id).unwrap();

        advisor
            .evaluate_and_store(student.id, &submission("Arts", "Design", Some(2.0)))
            .await
            .unwrap();
        let second = advisor.get_profile(student.id).unwrap();

        assert_eq!(advisor.list_profiles(None).unwrap().len(), 1);
        assert_eq!(second.profile.stream, Stream::Arts);
        assert_eq!(second.recommendation.as_deref(), Some("Graphic Design / Multimedia"));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_for_one_student_leave_one_row() {
        let advisor = setup();
        let student_id = register(&advisor, "racer").id;

        let mut handles = Vec::new();
        for i in 0..8 {
            let advisor = advisor.clone();
            let stream = if i % 2 == 0 { "Arts" } else { "Commerce" };
            handles.push(tokio::spawn(async move {
                advisor
                    .evaluate_and_store(student_id, &submission(stream, "Design", Some(2.5)))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let profiles = advisor.list_profiles(None).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].student_id, student_id);
    }
}

mod degraded_mode {
    use super::*;

    fn config(degrade: bool) -> AdvisorConfig {
        AdvisorConfig {
            evaluation_timeout: Duration::from_millis(20),
            degrade_on_failure: degrade,
            ..AdvisorConfig::default()
        }
    }

    #[tokio::test]
    async fn timeout_is_computation_error_by_default() {
        let advisor = Advisor::with_evaluator(
            database(),
            rules(),
            Arc::new(SlowEvaluator(Duration::from_millis(300))),
            &config(false),
        );
        let student = register(&advisor, "slow");

        let err = advisor
            .evaluate_and_store(student.id, &submission("Arts", "Law", Some(3.0)))
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::Computation(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(advisor.database().get_profile(student.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn timeout_degrades_when_configured() {
        let advisor = Advisor::with_evaluator(
            database(),
            rules(),
            Arc::new(SlowEvaluator(Duration::from_millis(300))),
            &config(true),
        );
        let student = register(&advisor, "patient");

        let evaluation = advisor
            .evaluate_and_store(student.id, &submission("Arts", "Law", Some(3.0)))
            .await
            .unwrap();

        assert!(evaluation.degraded);
        assert!(!evaluation.matched_by_rule);
        assert_eq!(evaluation.recommendation, DEFAULT_RECOMMENDATION);
    }

    #[tokio::test]
    async fn evaluator_error_propagates_without_degrade() {
        let advisor = Advisor::with_evaluator(
            database(),
            rules(),
            Arc::new(BrokenEvaluator),
            &config(false),
        );

        let err = advisor
            .preview(&submission("Arts", "Law", Some(3.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Computation(_)));
    }

    #[tokio::test]
    async fn configured_default_text_is_used() {
        let config = AdvisorConfig {
            default_recommendation: "See a career counsellor".to_string(),
            ..AdvisorConfig::default()
        };
        let advisor = Advisor::new(database(), rules(), &config);

        let result = advisor
            .preview(&submission("Biological Science", "Medicine", Some(1.0)))
            .await
            .unwrap();
        assert_eq!(result.recommendation, "See a career counsellor");
        assert!(!result.degraded);
    }
}

mod users {
    use super::*;

    #[test]
    fn rejects_duplicate_username() {
        let advisor = setup();
        register(&advisor, "dup");

        let err = advisor
            .register_user(CreateUserInput {
                username: "dup".to_string(),
                role: None,
            })
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Validation(_)));
    }

    #[test]
    fn rejects_blank_username() {
        let advisor = setup();
        let err = advisor
            .register_user(CreateUserInput {
                username: "   ".to_string(),
                role: None,
            })
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Validation(_)));
    }
}

mod students {
    use super::*;

    #[test]
    fn lists_roster_filtered_by_role() {
        let advisor = setup();
        let student = register(&advisor, "listed");

        tokio_test::block_on(advisor.evaluate_and_store(
            student.id,
            &submission("Physical Science", "Engineering", Some(3.9)),
        ))
        .unwrap();

        let students = advisor.list_students(Some(Role::Student)).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].username, "listed");
        assert_eq!(students[0].recommendation.as_deref(), Some("Engineering Technology"));

        let advisors = advisor.list_students(Some(Role::Advisor)).unwrap();
        assert_eq!(advisors.len(), 1);
        assert_eq!(advisors[0].username, "advisor");
    }

    #[test]
    fn missing_profile_is_not_found() {
        let advisor = setup();
        let student = register(&advisor, "empty");
        assert!(matches!(
            advisor.get_profile(student.id),
            Err(AdvisorError::NotFound(_))
        ));
    }
}

mod feedback {
    use super::*;

    #[test]
    fn latest_is_empty_without_feedback() {
        let advisor = setup();
        let student = register(&advisor, "none");
        assert_eq!(advisor.latest_feedback(student.id).unwrap(), "");
    }

    #[test]
    fn latest_returns_most_recent_text() {
        let advisor = setup();
        let student = register(&advisor, "reviewed");

        advisor.record_feedback(student.id, "advisor", "t1").unwrap();
        advisor.record_feedback(student.id, "advisor", "t2").unwrap();
        advisor.record_feedback(student.id, "advisor", "t3").unwrap();

        assert_eq!(advisor.latest_feedback(student.id).unwrap(), "t3");
        assert_eq!(advisor.feedback_history(student.id).unwrap().len(), 3);
    }

    #[test]
    fn unknown_student_is_not_found() {
        let advisor = setup();
        let err = advisor
            .record_feedback(Uuid::new_v4(), "advisor", "hello")
            .unwrap_err();
        assert!(matches!(err, AdvisorError::NotFound(_)));

        assert!(matches!(
            advisor.feedback_history(Uuid::new_v4()),
            Err(AdvisorError::NotFound(_))
        ));
    }

    #[test]
    fn advisor_account_is_not_a_student() {
        let advisor = setup();
        let account = advisor.get_user_by_username("advisor").unwrap();

        let err = advisor
            .record_feedback(account.id, "advisor", "note on an advisor")
            .unwrap_err();
        assert!(matches!(err, AdvisorError::NotFound(_)));
        assert_eq!(advisor.latest_feedback(account.id).unwrap(), "");

        assert!(matches!(
            advisor.feedback_history(account.id),
            Err(AdvisorError::NotFound(_))
        ));
    }

    #[test]
    fn empty_text_is_rejected() {
        let advisor = setup();
        let student = register(&advisor, "blank");
        let err = advisor.record_feedback(student.id, "advisor", "  ").unwrap_err();
        assert!(matches!(err, AdvisorError::Validation(_)));
    }
}
