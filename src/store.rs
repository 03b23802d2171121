use std::collections::HashMap;

use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::{Level, event, instrument};

use crate::slug::{slugify, with_suffix};
use crate::types::{
    account::{Account, AccountId, AccountSettings, Member, NewAccount},
    answer::{Answer, AnswerId, NewAnswer, RatedAnswer},
    question::{ListedQuestion, NewQuestion, Question, QuestionFilter, QuestionId},
    tag::Tag,
    vote::{TargetKind, VoteChange, VoteTarget, VoteValue, user_vote_value},
};

use handle_errors::Error;

const QUESTION_SELECT: &str = "SELECT q.id, q.slug, q.title, q.content, q.account_id, a.username,
    ARRAY(SELECT t.title::TEXT FROM question_tags qt JOIN tags t ON t.id = qt.tag_id
          WHERE qt.question_id = q.id ORDER BY t.title) AS tags,
    (SELECT COALESCE(SUM(v.value), 0) FROM votes v
     WHERE v.target_kind = 'question' AND v.target_id = q.id)::BIGINT AS rating,
    (SELECT COUNT(*) FROM answers an WHERE an.question_id = q.id AND an.is_active) AS answers_count
FROM questions q JOIN accounts a ON a.id = q.account_id
WHERE q.is_active";

const QUESTION_COUNT: &str = "SELECT COUNT(*) AS count
FROM questions q JOIN accounts a ON a.id = q.account_id
WHERE q.is_active";

const RATING: &str = "SELECT COALESCE(SUM(value), 0)::BIGINT AS rating
FROM votes WHERE target_kind = $1 AND target_id = $2";

/// Tables whose rows carry a unique slug.
#[derive(Debug, Clone, Copy)]
enum SlugScope {
    Account,
    Question,
    Tag,
}

impl SlugScope {
    fn lookup(self) -> &'static str {
        match self {
            SlugScope::Account => "SELECT 1 FROM accounts WHERE slug = $1",
            SlugScope::Question => "SELECT 1 FROM questions WHERE slug = $1",
            SlugScope::Tag => "SELECT 1 FROM tags WHERE slug = $1",
        }
    }
}

fn db_error(error: sqlx::Error) -> Error {
    event!(Level::ERROR, "{:?}", error);
    Error::DatabaseQueryError(error)
}

fn question_from_row(row: &PgRow) -> ListedQuestion {
    ListedQuestion {
        question: Question {
            id: QuestionId(row.get("id")),
            slug: row.get("slug"),
            title: row.get("title"),
            content: row.get("content"),
            account_id: AccountId(row.get("account_id")),
            author: row.get("username"),
            tags: row.get("tags"),
        },
        rating: row.get("rating"),
        answers_count: row.get("answers_count"),
    }
}

fn account_from_row(row: PgRow) -> Account {
    Account {
        id: AccountId(row.get("id")),
        username: row.get("username"),
        email: row.get("email"),
        password: row.get("password"),
        slug: row.get("slug"),
        is_superuser: row.get("is_superuser"),
    }
}

/// Escapes LIKE wildcards so search words match literally.
fn like_pattern(word: &str) -> String {
    let escaped = word
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter) {
    if let Some(tag_id) = filter.tag_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM question_tags qt WHERE qt.question_id = q.id AND qt.tag_id = ")
            .push_bind(tag_id)
            .push(")");
    }
    if let Some(account_id) = filter.account_id {
        query.push(" AND q.account_id = ").push_bind(account_id.0);
    }
    for word in &filter.search {
        let pattern = like_pattern(word);
        query
            .push(" AND (q.slug ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR q.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR q.content ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.username ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM question_tags qt JOIN tags t ON t.id = qt.tag_id WHERE qt.question_id = q.id AND t.slug ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

async fn unique_slug(conn: &mut PgConnection, scope: SlugScope, text: &str) -> Result<String, Error> {
    let base = slugify(text);
    let mut slug = base.clone();
    while sqlx::query(scope.lookup())
        .bind(&slug)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?
        .is_some()
    {
        slug = with_suffix(&base);
    }
    Ok(slug)
}

async fn tag_id_for(conn: &mut PgConnection, title: &str) -> Result<i32, Error> {
    let existing = sqlx::query("SELECT id FROM tags WHERE title = $1")
        .bind(title)
        .map(|row: PgRow| row.get::<i32, _>("id"))
        .fetch_optional(&mut *conn)
        .await
        .map_err(db_error)?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let slug = unique_slug(conn, SlugScope::Tag, title).await?;
    let inserted = sqlx::query(
        "INSERT INTO tags (title, slug) VALUES ($1, $2)
        ON CONFLICT (title) DO NOTHING
        RETURNING id",
    )
    .bind(title)
    .bind(slug)
    .map(|row: PgRow| row.get::<i32, _>("id"))
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?;

    match inserted {
        Some(id) => Ok(id),
        None => sqlx::query("SELECT id FROM tags WHERE title = $1")
            .bind(title)
            .map(|row: PgRow| row.get::<i32, _>("id"))
            .fetch_one(&mut *conn)
            .await
            .map_err(db_error),
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    pub connection: PgPool,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self, sqlx::Error> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Ok(Store {
            connection: db_pool,
        })
    }

    /// A store whose connections are only opened on first use.
    pub fn lazy(db_url: &str) -> Result<Self, sqlx::Error> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(db_url)?;

        Ok(Store {
            connection: db_pool,
        })
    }

    pub async fn add_account(&self, account: NewAccount) -> Result<AccountId, Error> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;
        let slug = unique_slug(&mut *tx, SlugScope::Account, &account.username).await?;

        let id = match sqlx::query(
            "INSERT INTO accounts (username, email, password, slug)
            VALUES ($1, $2, $3, $4)
            RETURNING id",
        )
        .bind(account.username)
        .bind(account.email)
        .bind(account.password)
        .bind(slug)
        .map(|row: PgRow| AccountId(row.get("id")))
        .fetch_one(&mut *tx)
        .await
        {
            Ok(id) => id,
            Err(error) => {
                if let Some(db) = error.as_database_error() {
                    event!(
                        Level::ERROR,
                        code = db.code().as_deref().unwrap_or_default(),
                        db_message = db.message(),
                        constraint = db.constraint().unwrap_or_default()
                    );
                }
                return Err(Error::DatabaseQueryError(error));
            }
        };

        tx.commit().await.map_err(db_error)?;
        Ok(id)
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, Error> {
        sqlx::query("SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .map(account_from_row)
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)
    }

    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, Error> {
        sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(id.0)
            .map(account_from_row)
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)
    }

    pub async fn find_account_by_slug(&self, slug: &str) -> Result<Option<AccountId>, Error> {
        sqlx::query("SELECT id FROM accounts WHERE slug = $1")
            .bind(slug)
            .map(|row: PgRow| AccountId(row.get("id")))
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)
    }

    /// Changes the login and email of `id`. Both must stay unique among
    /// the other accounts, compared case-insensitively.
    #[instrument(skip(self))]
    pub async fn update_account(
        &self,
        id: AccountId,
        settings: AccountSettings,
    ) -> Result<Member, Error> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        let username_taken = sqlx::query(
            "SELECT 1 FROM accounts WHERE LOWER(username) = LOWER($1) AND id <> $2",
        )
        .bind(&settings.username)
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .is_some();
        if username_taken {
            return Err(Error::InvalidInput(
                "This login is already taken by another user.".to_string(),
            ));
        }

        let email_taken = sqlx::query(
            "SELECT 1 FROM accounts WHERE LOWER(email) = LOWER($1) AND id <> $2",
        )
        .bind(&settings.email)
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .is_some();
        if email_taken {
            return Err(Error::InvalidInput(
                "This email is already taken by another user.".to_string(),
            ));
        }

        let member = sqlx::query(
            "UPDATE accounts SET username = $1, email = $2
            WHERE id = $3
            RETURNING id, username, slug",
        )
        .bind(settings.username)
        .bind(settings.email)
        .bind(id.0)
        .map(|row: PgRow| Member {
            id: AccountId(row.get("id")),
            username: row.get("username"),
            slug: row.get("slug"),
        })
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or(Error::NotFound("Account"))?;

        tx.commit().await.map_err(db_error)?;
        Ok(member)
    }

    /// The oldest superuser, if any.
    pub async fn first_superuser(&self) -> Result<Option<AccountId>, Error> {
        sqlx::query("SELECT id FROM accounts WHERE is_superuser ORDER BY id LIMIT 1")
            .map(|row: PgRow| AccountId(row.get("id")))
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)
    }

    pub async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<i32>, Error> {
        sqlx::query("SELECT id FROM tags WHERE slug = $1")
            .bind(slug)
            .map(|row: PgRow| row.get::<i32, _>("id"))
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)
    }

    pub async fn list_tags(&self, limit: i64) -> Result<Vec<Tag>, Error> {
        sqlx::query("SELECT id, title, slug FROM tags ORDER BY id LIMIT $1")
            .bind(limit)
            .map(|row: PgRow| Tag {
                id: row.get("id"),
                title: row.get("title"),
                slug: row.get("slug"),
            })
            .fetch_all(&self.connection)
            .await
            .map_err(db_error)
    }

    pub async fn list_members(&self, limit: i64) -> Result<Vec<Member>, Error> {
        sqlx::query("SELECT id, username, slug FROM accounts ORDER BY id LIMIT $1")
            .bind(limit)
            .map(|row: PgRow| Member {
                id: AccountId(row.get("id")),
                username: row.get("username"),
                slug: row.get("slug"),
            })
            .fetch_all(&self.connection)
            .await
            .map_err(db_error)
    }

    pub async fn count_questions(&self, filter: &QuestionFilter) -> Result<i64, Error> {
        let mut query = QueryBuilder::<Postgres>::new(QUESTION_COUNT);
        push_filter(&mut query, filter);

        let row = query
            .build()
            .fetch_one(&self.connection)
            .await
            .map_err(db_error)?;
        Ok(row.get("count"))
    }

    /// Newest questions first.
    pub async fn get_questions(
        &self,
        filter: &QuestionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ListedQuestion>, Error> {
        let mut query = QueryBuilder::<Postgres>::new(QUESTION_SELECT);
        push_filter(&mut query, filter);
        query
            .push(" ORDER BY q.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = query
            .build()
            .fetch_all(&self.connection)
            .await
            .map_err(db_error)?;
        Ok(rows.iter().map(question_from_row).collect())
    }

    pub async fn get_question(&self, id: QuestionId) -> Result<Option<ListedQuestion>, Error> {
        let sql = format!("{} AND q.id = $1", QUESTION_SELECT);
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)?;
        Ok(row.as_ref().map(question_from_row))
    }

    pub async fn get_question_by_slug(&self, slug: &str) -> Result<Option<ListedQuestion>, Error> {
        let sql = format!("{} AND q.slug = $1", QUESTION_SELECT);
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)?;
        Ok(row.as_ref().map(question_from_row))
    }

    pub async fn question_exists(&self, id: QuestionId) -> Result<bool, Error> {
        let row = sqlx::query("SELECT 1 FROM questions WHERE id = $1 AND is_active")
            .bind(id.0)
            .fetch_optional(&self.connection)
            .await
            .map_err(db_error)?;
        Ok(row.is_some())
    }

    /// Stores the question with a fresh slug and links its tags, creating
    /// the tags that don't exist yet.
    #[instrument(skip(self, new_question))]
    pub async fn add_question(
        &self,
        new_question: NewQuestion,
        account_id: AccountId,
    ) -> Result<Question, Error> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;
        let slug = unique_slug(&mut *tx, SlugScope::Question, &new_question.title).await?;

        let id = sqlx::query(
            "INSERT INTO questions (slug, title, content, account_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id",
        )
        .bind(&slug)
        .bind(&new_question.title)
        .bind(&new_question.content)
        .bind(account_id.0)
        .map(|row: PgRow| QuestionId(row.get("id")))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        for title in &new_question.tags {
            let tag_id = tag_id_for(&mut *tx, title).await?;
            sqlx::query(
                "INSERT INTO question_tags (question_id, tag_id) VALUES ($1, $2)
                ON CONFLICT DO NOTHING",
            )
            .bind(id.0)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        let author = sqlx::query("SELECT username FROM accounts WHERE id = $1")
            .bind(account_id.0)
            .map(|row: PgRow| row.get::<String, _>("username"))
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        let mut tags = new_question.tags;
        tags.sort();
        Ok(Question {
            id,
            slug,
            title: new_question.title,
            content: new_question.content,
            account_id,
            author,
            tags,
        })
    }

    /// Answers of a question with their ratings, in insertion order.
    /// `user_vote` is left at 0; see [`Store::user_votes`].
    pub async fn get_answers(&self, question_id: QuestionId) -> Result<Vec<RatedAnswer>, Error> {
        sqlx::query(
            "SELECT an.id, an.content, an.question_id, an.account_id, ac.username, an.is_correct,
                (SELECT COALESCE(SUM(v.value), 0) FROM votes v
                 WHERE v.target_kind = 'answer' AND v.target_id = an.id)::BIGINT AS rating
            FROM answers an JOIN accounts ac ON ac.id = an.account_id
            WHERE an.question_id = $1 AND an.is_active
            ORDER BY an.id",
        )
        .bind(question_id.0)
        .map(|row: PgRow| RatedAnswer {
            answer: Answer {
                id: AnswerId(row.get("id")),
                content: row.get("content"),
                question_id: QuestionId(row.get("question_id")),
                account_id: AccountId(row.get("account_id")),
                author: row.get("username"),
                is_correct: row.get("is_correct"),
            },
            rating: row.get("rating"),
            user_vote: 0,
        })
        .fetch_all(&self.connection)
        .await
        .map_err(db_error)
    }

    pub async fn add_answer(
        &self,
        new_answer: NewAnswer,
        account_id: AccountId,
    ) -> Result<Answer, Error> {
        sqlx::query(
            "INSERT INTO answers (content, question_id, account_id)
            VALUES ($1, $2, $3)
            RETURNING id, content, question_id, account_id, is_correct,
                (SELECT username FROM accounts WHERE id = $3) AS username",
        )
        .bind(new_answer.content)
        .bind(new_answer.question_id.0)
        .bind(account_id.0)
        .map(|row: PgRow| Answer {
            id: AnswerId(row.get("id")),
            content: row.get("content"),
            question_id: QuestionId(row.get("question_id")),
            account_id: AccountId(row.get("account_id")),
            author: row.get("username"),
            is_correct: row.get("is_correct"),
        })
        .fetch_one(&self.connection)
        .await
        .map_err(db_error)
    }

    /// The author of the question an answer belongs to.
    pub async fn answer_question_author(&self, id: AnswerId) -> Result<Option<AccountId>, Error> {
        sqlx::query(
            "SELECT q.account_id FROM answers an
            JOIN questions q ON q.id = an.question_id
            WHERE an.id = $1",
        )
        .bind(id.0)
        .map(|row: PgRow| AccountId(row.get("account_id")))
        .fetch_optional(&self.connection)
        .await
        .map_err(db_error)
    }

    pub async fn set_answer_correct(&self, id: AnswerId, is_correct: bool) -> Result<(), Error> {
        sqlx::query("UPDATE answers SET is_correct = $1 WHERE id = $2")
            .bind(is_correct)
            .bind(id.0)
            .execute(&self.connection)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Casts, switches or retracts the account's vote on `target` and
    /// returns the target's new rating.
    ///
    /// Runs in one transaction that first locks the target row, so toggles
    /// on the same target are serialized and the returned rating includes
    /// this change.
    #[instrument(skip(self))]
    pub async fn toggle_vote(
        &self,
        account_id: AccountId,
        target: VoteTarget,
        value: VoteValue,
    ) -> Result<i64, Error> {
        let kind = target.kind();
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        let lock = match kind {
            TargetKind::Question => "SELECT id FROM questions WHERE id = $1 FOR UPDATE",
            TargetKind::Answer => "SELECT id FROM answers WHERE id = $1 FOR UPDATE",
        };
        let found = sqlx::query(lock)
            .bind(target.id())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if found.is_none() {
            return Err(Error::NotFound(kind.label()));
        }

        let existing = sqlx::query(
            "SELECT value FROM votes
            WHERE account_id = $1 AND target_kind = $2 AND target_id = $3",
        )
        .bind(account_id.0)
        .bind(kind.as_str())
        .bind(target.id())
        .map(|row: PgRow| row.get::<i16, _>("value"))
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .and_then(VoteValue::from_i16);

        let change = VoteChange::resolve(existing, value);
        let statement = match change {
            VoteChange::Cast(value) => sqlx::query(
                "INSERT INTO votes (account_id, target_kind, target_id, value)
                VALUES ($1, $2, $3, $4)",
            )
            .bind(account_id.0)
            .bind(kind.as_str())
            .bind(target.id())
            .bind(value.as_i16()),
            VoteChange::Retract(_) => sqlx::query(
                "DELETE FROM votes
                WHERE account_id = $1 AND target_kind = $2 AND target_id = $3",
            )
            .bind(account_id.0)
            .bind(kind.as_str())
            .bind(target.id()),
            VoteChange::Switch { to, .. } => sqlx::query(
                "UPDATE votes SET value = $4
                WHERE account_id = $1 AND target_kind = $2 AND target_id = $3",
            )
            .bind(account_id.0)
            .bind(kind.as_str())
            .bind(target.id())
            .bind(to.as_i16()),
        };
        statement
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let rating = sqlx::query(RATING)
            .bind(kind.as_str())
            .bind(target.id())
            .map(|row: PgRow| row.get::<i64, _>("rating"))
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        event!(
            Level::INFO,
            ?change,
            delta = change.rating_delta(),
            user_vote = user_vote_value(change.resulting_vote()),
            rating,
            "vote toggled"
        );
        Ok(rating)
    }

    /// Sum of all votes on `target`; 0 when nobody voted.
    pub async fn rating(&self, target: VoteTarget) -> Result<i64, Error> {
        sqlx::query(RATING)
            .bind(target.kind().as_str())
            .bind(target.id())
            .map(|row: PgRow| row.get::<i64, _>("rating"))
            .fetch_one(&self.connection)
            .await
            .map_err(db_error)
    }

    /// The caller's vote on `target`: -1, 0 or 1. Anonymous callers get 0
    /// without touching the database.
    pub async fn user_vote(
        &self,
        target: VoteTarget,
        account_id: Option<AccountId>,
    ) -> Result<i16, Error> {
        let Some(account_id) = account_id else {
            return Ok(0);
        };

        let vote = sqlx::query(
            "SELECT value FROM votes
            WHERE account_id = $1 AND target_kind = $2 AND target_id = $3",
        )
        .bind(account_id.0)
        .bind(target.kind().as_str())
        .bind(target.id())
        .map(|row: PgRow| row.get::<i16, _>("value"))
        .fetch_optional(&self.connection)
        .await
        .map_err(db_error)?;

        Ok(user_vote_value(vote.and_then(VoteValue::from_i16)))
    }

    /// The caller's votes on several targets of one kind. Targets the
    /// caller hasn't voted on are absent from the map.
    pub async fn user_votes(
        &self,
        kind: TargetKind,
        ids: Vec<i32>,
        account_id: Option<AccountId>,
    ) -> Result<HashMap<i32, i16>, Error> {
        let Some(account_id) = account_id else {
            return Ok(HashMap::new());
        };
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT target_id, value FROM votes
            WHERE account_id = $1 AND target_kind = $2 AND target_id = ANY($3)",
        )
        .bind(account_id.0)
        .bind(kind.as_str())
        .bind(ids)
        .map(|row: PgRow| (row.get::<i32, _>("target_id"), row.get::<i16, _>("value")))
        .fetch_all(&self.connection)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().collect())
    }
}
