//! Diesel table definitions for the dashboard store.
//!
//! Tables: repositories, builds. `builds.commit_sha` carries a unique index
//! so concurrent syncs cannot record the same commit twice.

diesel::table! {
    repositories (id) {
        id -> Int8,
        name -> Varchar,
        github_url -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    builds (id) {
        id -> Int8,
        repository_id -> Int8,
        status -> Varchar,
        commit_sha -> Varchar,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(builds -> repositories (repository_id));

diesel::allow_tables_to_appear_in_same_query!(repositories, builds);
