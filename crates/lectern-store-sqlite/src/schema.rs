//! SQL schema for the Lectern SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS cities (
    city_id INTEGER PRIMARY KEY,
    name    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,   -- login name
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    phone_number  TEXT,
    avatar        TEXT NOT NULL,
    city_id       INTEGER REFERENCES cities(city_id) ON DELETE SET NULL,
    is_superuser  INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_groups (
    group_id INTEGER PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS auth_group_members (
    group_id INTEGER NOT NULL REFERENCES auth_groups(group_id) ON DELETE CASCADE,
    user_id  INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    PRIMARY KEY (group_id, user_id)
);

CREATE TABLE IF NOT EXISTS courses (
    course_id   INTEGER PRIMARY KEY,
    title       TEXT NOT NULL UNIQUE,
    preview     TEXT NOT NULL,
    description TEXT,
    price       INTEGER NOT NULL DEFAULT 0 CHECK (price >= 0),   -- minor units
    owner_id    INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lessons (
    lesson_id   INTEGER PRIMARY KEY,
    title       TEXT NOT NULL UNIQUE,
    description TEXT,
    preview     TEXT NOT NULL,
    video_link  TEXT,
    course_id   INTEGER NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    owner_id    INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
    price       INTEGER NOT NULL DEFAULT 0 CHECK (price >= 0),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Rows are only ever inserted or deleted, never updated.
CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id INTEGER PRIMARY KEY,
    user_id         INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    course_id       INTEGER NOT NULL REFERENCES courses(course_id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL,
    UNIQUE (user_id, course_id)
);

CREATE TABLE IF NOT EXISTS payments (
    payment_id          INTEGER PRIMARY KEY,
    user_id             INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    payment_amount      INTEGER NOT NULL,   -- minor units
    paid_course_id      INTEGER REFERENCES courses(course_id) ON DELETE SET NULL,
    paid_lesson_id      INTEGER REFERENCES lessons(lesson_id) ON DELETE SET NULL,
    payment_method      TEXT NOT NULL,      -- 'cash' | 'transfer'
    created_at          TEXT NOT NULL,      -- RFC 3339 UTC, fixed width
    checkout_product_id TEXT,
    checkout_price_id   TEXT,
    checkout_session_id TEXT,
    checkout_url        TEXT
);

CREATE INDEX IF NOT EXISTS lessons_course_idx       ON lessons(course_id);
CREATE INDEX IF NOT EXISTS subscriptions_course_idx ON subscriptions(course_id);
CREATE INDEX IF NOT EXISTS payments_user_idx        ON payments(user_id);
CREATE INDEX IF NOT EXISTS payments_created_idx     ON payments(created_at);

PRAGMA user_version = 1;
";
