use crate::{
    post::{Post, PostDraft},
    user::User,
    PostboardError, PostboardResult,
};
use rand::{thread_rng, Rng};
use sqlite::{Connection, State};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const USERS_TABLE: &str = "users";
pub const POSTS_TABLE: &str = "posts";

/// Demo users written by `seed_users`: name, username, email, phone, street, city, state, zipcode.
const SEED_USERS: [[&str; 8]; 12] = [
    ["Leanne Graham", "Bret", "sincere@april.biz", "1-770-736-8031", "Kulas Light", "Gwenborough", "Alabama", "92998"],
    ["Ervin Howell", "Antonette", "shanna@melissa.tv", "010-692-6593", "Victor Plains", "Wisokyburgh", "Alaska", "90566"],
    ["Clementine Bauch", "Samantha", "nathan@yesenia.net", "1-463-123-4447", "Douglas Extension", "McKenziehaven", "Arizona", "59590"],
    ["Patricia Lebsack", "Karianne", "julianne.oconner@kory.org", "493-170-9623", "Hoeger Mall", "South Elvis", "Arkansas", "53919"],
    ["Chelsey Dietrich", "Kamren", "lucio_hettinger@annie.ca", "254-954-1289", "Skiles Walks", "Roscoeview", "California", "33263"],
    ["Dennis Schulist", "Leopoldo_Corkery", "karley_dach@jasper.info", "1-477-935-8478", "Norberto Crossing", "South Christy", "Colorado", "23505"],
    ["Kurtis Weissnat", "Elwyn.Skiles", "telly.hoeger@billy.biz", "210-067-6132", "Rex Trail", "Howemouth", "Connecticut", "58804"],
    ["Nicholas Runolfsdottir", "Maxime_Nienow", "sherwood@rosamond.me", "586-493-6943", "Ellsworth Summit", "Aliyaview", "Delaware", "45169"],
    ["Glenna Reichert", "Delphine", "chaim_mcdermott@dana.io", "775-976-6794", "Dayna Park", "Bartholomebury", "Florida", "76495"],
    ["Clementina DuBuque", "Moriah.Stanton", "rey.padberg@karina.biz", "024-648-3804", "Kattie Turnpike", "Lebsackbury", "Georgia", "31428"],
    ["Edna Welch", "Edna.W", "edna@welch.dev", "555-014-2201", "Maple Row", "Springfield", "Hawaii", "96813"],
    ["Oscar Brandt", "obrandt", "oscar@brandt.org", "555-019-7730", "Harbor Lane", "Portsmouth", "Idaho", "83702"],
];

/// Open (creating if needed) the Db at `path` and make sure the tables exist.
pub fn open(path: &Path) -> PostboardResult<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut conn = sqlite::open(path).map_err(PostboardError::from)?;
    conn.execute("PRAGMA foreign_keys = ON;")
        .map_err(PostboardError::from)?;
    setup_tables(&mut conn)?;
    debug!(path = %path.display(), "Opened db");
    Ok(conn)
}

/// In-memory Db with the tables in place. Used by tests.
pub fn open_in_memory() -> PostboardResult<Connection> {
    let mut conn = sqlite::open(":memory:").map_err(PostboardError::from)?;
    conn.execute("PRAGMA foreign_keys = ON;")
        .map_err(PostboardError::from)?;
    setup_tables(&mut conn)?;
    Ok(conn)
}

pub fn setup_tables(conn: &mut Connection) -> PostboardResult<()> {
    let statement = format!(
        "
        CREATE TABLE IF NOT EXISTS {USERS_TABLE}
        (id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        phone TEXT NOT NULL,
        street TEXT,
        city TEXT,
        state TEXT,
        zipcode TEXT);

        CREATE TABLE IF NOT EXISTS {POSTS_TABLE}
        (id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES {USERS_TABLE}(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL);

        CREATE INDEX IF NOT EXISTS idx_posts_user_id ON {POSTS_TABLE}(user_id);
    "
    );

    conn.execute(statement).map_err(PostboardError::from)?;

    Ok(())
}

/// Column names of `table_name`, in declaration order.
pub fn query_table_info(conn: &Connection, table_name: &str) -> PostboardResult<Vec<String>> {
    let statement = format!("PRAGMA table_info({table_name});");
    let mut stmt = conn.prepare(statement).map_err(PostboardError::from)?;

    let mut columns = Vec::new();
    while let State::Row = stmt.next().map_err(PostboardError::from)? {
        columns.push(stmt.read::<String, _>("name").map_err(PostboardError::from)?);
    }
    Ok(columns)
}

// ***
// Users
// ***

/// Insert a user and return it with its assigned ID. The `id` of `user` is ignored.
pub fn insert_user(conn: &Connection, user: &User) -> PostboardResult<User> {
    let mut stmt = conn
        .prepare(format!(
            "INSERT INTO {USERS_TABLE} (name, username, email, phone, street, city, state, zipcode)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .map_err(PostboardError::from)?;
    stmt.bind((1, user.name.as_str())).map_err(PostboardError::from)?;
    stmt.bind((2, user.username.as_str()))
        .map_err(PostboardError::from)?;
    stmt.bind((3, user.email.as_str())).map_err(PostboardError::from)?;
    stmt.bind((4, user.phone.as_str())).map_err(PostboardError::from)?;
    stmt.bind((5, user.street.as_deref()))
        .map_err(PostboardError::from)?;
    stmt.bind((6, user.city.as_deref())).map_err(PostboardError::from)?;
    stmt.bind((7, user.state.as_deref()))
        .map_err(PostboardError::from)?;
    stmt.bind((8, user.zipcode.as_deref()))
        .map_err(PostboardError::from)?;
    stmt.next().map_err(PostboardError::from)?;

    let mut stored = user.clone();
    stored.id = last_insert_rowid(conn)?;
    Ok(stored)
}

/// Fill an empty users table with the demo users. Returns how many were added.
pub fn seed_users(conn: &Connection) -> PostboardResult<usize> {
    if count_users(conn)? > 0 {
        return Ok(0);
    }
    for [name, username, email, phone, street, city, state, zipcode] in SEED_USERS {
        insert_user(
            conn,
            &User {
                id: 0,
                name: name.into(),
                username: username.into(),
                email: email.into(),
                phone: phone.into(),
                street: Some(street.into()),
                city: Some(city.into()),
                state: Some(state.into()),
                zipcode: Some(zipcode.into()),
            },
        )?;
    }
    info!(count = SEED_USERS.len(), "Seeded users table");
    Ok(SEED_USERS.len())
}

/// One page of users ordered by ID. `page_number` is 0 based.
pub fn query_users(
    conn: &Connection,
    page_number: u32,
    page_size: u32,
) -> PostboardResult<Vec<User>> {
    let mut stmt = conn
        .prepare(format!(
            "SELECT * FROM {USERS_TABLE} ORDER BY id LIMIT ? OFFSET ?"
        ))
        .map_err(PostboardError::from)?;
    stmt.bind((1, i64::from(page_size)))
        .map_err(PostboardError::from)?;
    stmt.bind((2, i64::from(page_number) * i64::from(page_size)))
        .map_err(PostboardError::from)?;

    let mut users = Vec::new();
    while let State::Row = stmt.next().map_err(PostboardError::from)? {
        users.push(User::parse_sqlite_row(&stmt)?);
    }
    Ok(users)
}

pub fn count_users(conn: &Connection) -> PostboardResult<u64> {
    let mut stmt = conn
        .prepare(format!("SELECT COUNT(*) FROM {USERS_TABLE}"))
        .map_err(PostboardError::from)?;
    stmt.next().map_err(PostboardError::from)?;
    let count = stmt.read::<i64, _>(0).map_err(PostboardError::from)?;
    Ok(count.try_into()?)
}

pub fn user_exists(conn: &Connection, user_id: i64) -> PostboardResult<bool> {
    let mut stmt = conn
        .prepare(format!("SELECT 1 FROM {USERS_TABLE} WHERE id = ?"))
        .map_err(PostboardError::from)?;
    stmt.bind((1, user_id)).map_err(PostboardError::from)?;
    Ok(stmt.next().map_err(PostboardError::from)? == State::Row)
}

// ***
// Posts
// ***

/// All posts of a user, newest first.
pub fn query_posts_by_user(conn: &Connection, user_id: i64) -> PostboardResult<Vec<Post>> {
    let mut stmt = conn
        .prepare(format!(
            "SELECT * FROM {POSTS_TABLE} WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .map_err(PostboardError::from)?;
    stmt.bind((1, user_id)).map_err(PostboardError::from)?;

    let mut posts = Vec::new();
    while let State::Row = stmt.next().map_err(PostboardError::from)? {
        posts.push(Post::parse_sqlite_row(&stmt)?);
    }
    Ok(posts)
}

pub fn query_post_by_id(conn: &Connection, post_id: i64) -> PostboardResult<Post> {
    let mut stmt = conn
        .prepare(format!("SELECT * FROM {POSTS_TABLE} WHERE id = ?"))
        .map_err(PostboardError::from)?;
    stmt.bind((1, post_id)).map_err(PostboardError::from)?;

    match stmt.next().map_err(PostboardError::from)? {
        State::Row => Post::parse_sqlite_row(&stmt),
        State::Done => Err(PostboardError::PostNotFound { id: post_id }.into()),
    }
}

/// Insert a validated draft for `user_id` and return the stored post.
pub fn insert_post(conn: &Connection, user_id: i64, draft: PostDraft) -> PostboardResult<Post> {
    if !user_exists(conn, user_id)? {
        return Err(PostboardError::UserNotFound { id: user_id }.into());
    }
    let mut post = Post::new(0, user_id, draft);
    let mut stmt = conn
        .prepare(format!(
            "INSERT INTO {POSTS_TABLE} (user_id, title, body, created_at) VALUES (?, ?, ?, ?)"
        ))
        .map_err(PostboardError::from)?;
    stmt.bind((1, post.user_id)).map_err(PostboardError::from)?;
    stmt.bind((2, post.title.as_str()))
        .map_err(PostboardError::from)?;
    stmt.bind((3, post.body.as_str())).map_err(PostboardError::from)?;
    stmt.bind((4, post.created_at.as_str()))
        .map_err(PostboardError::from)?;
    stmt.next().map_err(PostboardError::from)?;

    post.id = last_insert_rowid(conn)?;
    Ok(post)
}

/// Replace title and body of an existing post.
pub fn update_post(conn: &Connection, post_id: i64, draft: PostDraft) -> PostboardResult<()> {
    // Fails with PostNotFound when there is nothing to update.
    query_post_by_id(conn, post_id)?;

    let mut stmt = conn
        .prepare(format!(
            "UPDATE {POSTS_TABLE} SET title = ?, body = ? WHERE id = ?"
        ))
        .map_err(PostboardError::from)?;
    stmt.bind((1, draft.title.as_str()))
        .map_err(PostboardError::from)?;
    stmt.bind((2, draft.body.as_str()))
        .map_err(PostboardError::from)?;
    stmt.bind((3, post_id)).map_err(PostboardError::from)?;
    stmt.next().map_err(PostboardError::from)?;
    Ok(())
}

pub fn delete_post_by_id(conn: &Connection, post_id: i64) -> PostboardResult<()> {
    query_post_by_id(conn, post_id)?;

    let mut stmt = conn
        .prepare(format!("DELETE FROM {POSTS_TABLE} WHERE id = ?"))
        .map_err(PostboardError::from)?;
    stmt.bind((1, post_id)).map_err(PostboardError::from)?;
    stmt.next().map_err(PostboardError::from)?;
    Ok(())
}

fn last_insert_rowid(conn: &Connection) -> PostboardResult<i64> {
    let mut stmt = conn
        .prepare("SELECT last_insert_rowid()")
        .map_err(PostboardError::from)?;
    stmt.next().map_err(PostboardError::from)?;
    Ok(stmt.read::<i64, _>(0).map_err(PostboardError::from)?)
}

/// Generates a random db name with four 16-bit fields, such that when generating
/// random numbers, the range of each 16 bit field is 0-65536. Hence,
/// each random db name is `prefix-xxxxx-xxxxx-xxxxx-xxxxx.db`
/// The generated digits are padded with zeroes to ensure standardised
/// length of each field.
pub fn generate_random_db_name() -> String {
    let mut buffer = [0u16; 4];
    thread_rng().fill(&mut buffer);
    let mut result = buffer
        .into_iter()
        .map(|val| format!("{:05}", val))
        .collect::<Vec<String>>()
        .join("-");
    result.insert_str(0, "postboard-");
    result.push_str(".db");
    result
}

pub fn generate_temp_db() -> PathBuf {
    std::env::temp_dir().join(generate_random_db_name())
}
