//! Store tests against a real PostgreSQL database. They run when
//! `DATABASE_URL` is set and are skipped otherwise.

use std::collections::HashMap;

use askboard::handle_errors::Error;
use askboard::routes::answer::mark_correct;
use askboard::store::Store;
use askboard::types::account::{AccountId, AccountSettings, NewAccount, Session};
use askboard::types::answer::{Answer, AnswerId, NewAnswer};
use askboard::types::question::{NewQuestion, Question, QuestionId};
use askboard::types::vote::{VoteTarget, VoteValue};
use chrono::Utc;
use pretty_assertions::assert_eq;

async fn store() -> Option<Store> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let store = Store::new(&url).await.unwrap();
    sqlx::migrate!("./migrations")
        .run(&store.connection)
        .await
        .unwrap();
    Some(store)
}

async fn account(store: &Store, name: &str) -> AccountId {
    let name = format!("{}-{}", name, uuid::Uuid::new_v4().to_simple());
    store
        .add_account(NewAccount {
            email: format!("{}@example.com", name),
            username: name,
            password: "hash".to_string(),
        })
        .await
        .unwrap()
}

async fn question(store: &Store, author: AccountId) -> Question {
    store
        .add_question(
            NewQuestion {
                title: "Why does the borrow checker complain?".to_string(),
                content: "It says the value was moved.".to_string(),
                tags: vec!["rust".to_string()],
            },
            author,
        )
        .await
        .unwrap()
}

async fn answer(store: &Store, question: &Question, author: AccountId) -> Answer {
    store
        .add_answer(
            NewAnswer {
                content: "Clone it.".to_string(),
                question_id: question.id,
            },
            author,
        )
        .await
        .unwrap()
}

async fn vote_rows(store: &Store, account_id: AccountId, target: VoteTarget) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM votes
        WHERE account_id = $1 AND target_kind = $2 AND target_id = $3",
    )
    .bind(account_id.0)
    .bind(target.kind().as_str())
    .bind(target.id())
    .fetch_one(&store.connection)
    .await
    .unwrap()
}

async fn is_correct(store: &Store, question: &Question, id: AnswerId) -> bool {
    store
        .get_answers(question.id)
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.answer.id == id)
        .map(|a| a.answer.is_correct)
        .unwrap()
}

fn session(account_id: AccountId) -> Session {
    let now = Utc::now();
    Session {
        exp: now + chrono::Duration::days(1),
        account_id,
        nbf: now,
    }
}

#[tokio::test]
async fn unvoted_entity_has_zero_rating() {
    let Some(store) = store().await else { return };
    let author = account(&store, "author").await;
    let target = VoteTarget::Question(question(&store, author).await.id);

    assert_eq!(store.rating(target).await.unwrap(), 0);
    assert_eq!(store.user_vote(target, Some(author)).await.unwrap(), 0);
    assert_eq!(store.user_vote(target, None).await.unwrap(), 0);
}

#[tokio::test]
async fn same_vote_twice_restores_the_rating() {
    let Some(store) = store().await else { return };
    let author = account(&store, "author").await;
    let voter = account(&store, "voter").await;
    let other = account(&store, "other").await;
    let target = VoteTarget::Question(question(&store, author).await.id);

    assert_eq!(store.toggle_vote(other, target, VoteValue::Up).await.unwrap(), 1);

    for value in [VoteValue::Up, VoteValue::Down] {
        let cast = store.toggle_vote(voter, target, value).await.unwrap();
        assert_eq!(cast, 1 + i64::from(value.as_i16()));
        assert_eq!(store.user_vote(target, Some(voter)).await.unwrap(), value.as_i16());

        let retracted = store.toggle_vote(voter, target, value).await.unwrap();
        assert_eq!(retracted, 1);
        assert_eq!(vote_rows(&store, voter, target).await, 0);
        assert_eq!(store.user_vote(target, Some(voter)).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn opposite_votes_switch_in_place() {
    let Some(store) = store().await else { return };
    let author = account(&store, "author").await;
    let voter = account(&store, "voter").await;
    let question = question(&store, author).await;
    let target = VoteTarget::Answer(answer(&store, &question, author).await.id);

    let first = store.toggle_vote(voter, target, VoteValue::Up).await.unwrap();
    let second = store.toggle_vote(voter, target, VoteValue::Down).await.unwrap();

    assert_eq!(first, 1);
    assert_eq!(second - first, -2);
    assert_eq!(second, -1);
    assert_eq!(vote_rows(&store, voter, target).await, 1);
    assert_eq!(store.rating(target).await.unwrap(), -1);
    assert_eq!(store.user_vote(target, Some(voter)).await.unwrap(), -1);
}

#[tokio::test]
async fn question_and_answer_with_same_id_are_rated_apart() {
    let Some(store) = store().await else { return };
    let author = account(&store, "author").await;
    let voter = account(&store, "voter").await;
    let question = question(&store, author).await;
    let answer = answer(&store, &question, author).await;

    store
        .toggle_vote(voter, VoteTarget::Answer(answer.id), VoteValue::Down)
        .await
        .unwrap();

    let shadow = VoteTarget::Question(QuestionId(answer.id.0));
    assert_eq!(vote_rows(&store, voter, shadow).await, 0);
}

#[tokio::test]
async fn vote_on_missing_entity_is_not_found() {
    let Some(store) = store().await else { return };
    let voter = account(&store, "voter").await;

    for target in [
        VoteTarget::Answer(AnswerId(i32::MAX)),
        VoteTarget::Question(QuestionId(i32::MAX)),
    ] {
        let result = store.toggle_vote(voter, target, VoteValue::Up).await;
        assert!(matches!(result, Err(Error::NotFound(_))), "{:?}", result);
        assert_eq!(vote_rows(&store, voter, target).await, 0);
    }
}

#[tokio::test]
async fn only_author_or_superuser_marks_answers() {
    let Some(store) = store().await else { return };
    let author = account(&store, "author").await;
    let stranger = account(&store, "stranger").await;
    let admin = account(&store, "admin").await;
    sqlx::query("UPDATE accounts SET is_superuser = TRUE WHERE id = $1")
        .bind(admin.0)
        .execute(&store.connection)
        .await
        .unwrap();

    let question = question(&store, author).await;
    let answer = answer(&store, &question, stranger).await;
    let checked = HashMap::from([("is_correct".to_string(), "on".to_string())]);

    let refused = mark_correct(answer.id.0, session(stranger), None, store.clone(), checked.clone()).await;
    let rejection = refused.err().unwrap();
    assert!(matches!(rejection.find::<Error>(), Some(Error::Forbidden(_))));
    assert!(!is_correct(&store, &question, answer.id).await);

    assert!(
        mark_correct(answer.id.0, session(author), None, store.clone(), checked.clone())
            .await
            .is_ok()
    );
    assert!(is_correct(&store, &question, answer.id).await);

    // a stranger can't clear the mark either
    let refused = mark_correct(answer.id.0, session(stranger), None, store.clone(), HashMap::new()).await;
    assert!(refused.is_err());
    assert!(is_correct(&store, &question, answer.id).await);

    assert!(
        mark_correct(answer.id.0, session(admin), None, store.clone(), HashMap::new())
            .await
            .is_ok()
    );
    assert!(!is_correct(&store, &question, answer.id).await);
}

#[tokio::test]
async fn marking_missing_answer_is_not_found() {
    let Some(store) = store().await else { return };
    let author = account(&store, "author").await;

    let result = mark_correct(i32::MAX, session(author), None, store.clone(), HashMap::new()).await;
    let rejection = result.err().unwrap();
    assert!(matches!(rejection.find::<Error>(), Some(Error::NotFound(_))));
}

#[tokio::test]
async fn usernames_and_emails_are_unique_ignoring_case() {
    let Some(store) = store().await else { return };
    let name = format!("Alice-{}", uuid::Uuid::new_v4().to_simple());
    store
        .add_account(NewAccount {
            username: name.clone(),
            email: format!("{}@example.com", name),
            password: "hash".to_string(),
        })
        .await
        .unwrap();

    let duplicate = store
        .add_account(NewAccount {
            username: name.to_lowercase(),
            email: format!("other-{}@example.com", name),
            password: "hash".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(Error::DatabaseQueryError(_))));

    let duplicate = store
        .add_account(NewAccount {
            username: format!("other-{}", name),
            email: format!("{}@EXAMPLE.com", name.to_uppercase()),
            password: "hash".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(Error::DatabaseQueryError(_))));
}

#[tokio::test]
async fn settings_refuse_values_taken_by_others() {
    let Some(store) = store().await else { return };
    let alice = account(&store, "alice").await;
    let bob = account(&store, "bob").await;
    let bob_account = store.get_account(&bob).await.unwrap().unwrap();

    let taken_login = store
        .update_account(
            alice,
            AccountSettings {
                username: bob_account.username.to_uppercase(),
                email: "fresh@example.com".to_string(),
            },
        )
        .await;
    match taken_login {
        Err(Error::InvalidInput(message)) => {
            assert_eq!(message, "This login is already taken by another user.")
        }
        other => panic!("unexpected {:?}", other),
    }

    let taken_email = store
        .update_account(
            alice,
            AccountSettings {
                username: format!("fresh-{}", uuid::Uuid::new_v4().to_simple()),
                email: bob_account.email.clone(),
            },
        )
        .await;
    match taken_email {
        Err(Error::InvalidInput(message)) => {
            assert_eq!(message, "This email is already taken by another user.")
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn settings_keep_own_values_and_change_others() {
    let Some(store) = store().await else { return };
    let alice = account(&store, "alice").await;
    let before = store.get_account(&alice).await.unwrap().unwrap();

    // resubmitting the current values isn't a conflict
    let member = store
        .update_account(
            alice,
            AccountSettings {
                username: before.username.clone(),
                email: before.email.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(member.username, before.username);

    let renamed = format!("renamed-{}", uuid::Uuid::new_v4().to_simple());
    let member = store
        .update_account(
            alice,
            AccountSettings {
                username: renamed.clone(),
                email: format!("{}@example.com", renamed),
            },
        )
        .await
        .unwrap();
    assert_eq!(member.username, renamed);
    assert_eq!(member.slug, before.slug);

    let after = store.get_account(&alice).await.unwrap().unwrap();
    assert_eq!(after.email, format!("{}@example.com", renamed));
}
