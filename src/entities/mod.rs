// ABOUTME: SeaORM entities module for the blog's database models
// ABOUTME: Exports users, categories, posts and comments

pub mod blog_category;
pub mod blog_post;
pub mod comment;
pub mod user;
