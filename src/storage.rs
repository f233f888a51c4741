// ABOUTME: SeaORM storage layer for users, categories, posts and comments
// ABOUTME: Every relationship is fetched by an explicit query on its foreign key

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use crate::entities::{blog_category, blog_post, comment, user};
use crate::error::{AppError, Result};
use crate::migration::Migrator;

/// Image shown for categories and posts created without one.
pub const DEFAULT_IMAGE_URL: &str = "/static/img/placeholder.svg";

const POST_DATE_FORMAT: &str = "%B %d, %Y";
const COMMENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub struct Storage {
    pub db: DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub title: String,
    pub subtitle: String,
    pub img_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostFields {
    pub title: String,
    pub subtitle: String,
    pub body: String,
    pub img_url: Option<String>,
}

impl Storage {
    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = Database::connect(database_url).await?;
        Migrator::up(&db, None).await?;
        tracing::info!("Database ready");

        Ok(Self { db })
    }

    // Users

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<user::Model> {
        let user = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password: Set(password_hash.to_string()),
            ..Default::default()
        };

        Ok(user.insert(&self.db).await?)
    }

    pub async fn find_user(&self, user_id: i32) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<blog_category::Model>> {
        Ok(blog_category::Entity::find()
            .order_by_asc(blog_category::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn find_category(&self, category_id: i32) -> Result<Option<blog_category::Model>> {
        Ok(blog_category::Entity::find_by_id(category_id)
            .one(&self.db)
            .await?)
    }

    pub async fn get_category(&self, category_id: i32) -> Result<blog_category::Model> {
        self.find_category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category {}", category_id)))
    }

    pub async fn find_category_by_title(
        &self,
        title: &str,
    ) -> Result<Option<blog_category::Model>> {
        Ok(blog_category::Entity::find()
            .filter(blog_category::Column::Title.eq(title))
            .one(&self.db)
            .await?)
    }

    pub async fn create_category(
        &self,
        fields: CategoryFields,
        author_id: i32,
    ) -> Result<blog_category::Model> {
        let category = blog_category::ActiveModel {
            title: Set(fields.title),
            subtitle: Set(fields.subtitle),
            img_url: Set(image_or_default(fields.img_url)),
            author_id: Set(author_id),
            ..Default::default()
        };

        Ok(category.insert(&self.db).await?)
    }

    pub async fn update_category(
        &self,
        category_id: i32,
        fields: CategoryFields,
    ) -> Result<blog_category::Model> {
        let mut category: blog_category::ActiveModel =
            self.get_category(category_id).await?.into();
        category.title = Set(fields.title);
        category.subtitle = Set(fields.subtitle);
        category.img_url = Set(image_or_default(fields.img_url));

        Ok(category.update(&self.db).await?)
    }

    /// Removes the category together with its posts and their comments.
    pub async fn delete_category(&self, category_id: i32) -> Result<()> {
        let txn = self.db.begin().await?;

        let post_ids: Vec<i32> = blog_post::Entity::find()
            .filter(blog_post::Column::CategoryId.eq(category_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|post| post.id)
            .collect();

        if !post_ids.is_empty() {
            comment::Entity::delete_many()
                .filter(comment::Column::ParentPostId.is_in(post_ids.clone()))
                .exec(&txn)
                .await?;
            blog_post::Entity::delete_many()
                .filter(blog_post::Column::Id.is_in(post_ids.clone()))
                .exec(&txn)
                .await?;
        }

        let deleted = blog_category::Entity::delete_by_id(category_id)
            .exec(&txn)
            .await?;
        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::NotFound(format!("category {}", category_id)));
        }

        txn.commit().await?;
        tracing::info!(category_id, posts = post_ids.len(), "Deleted category");
        Ok(())
    }

    // Posts

    pub async fn posts_in_category(&self, category_id: i32) -> Result<Vec<blog_post::Model>> {
        Ok(blog_post::Entity::find()
            .filter(blog_post::Column::CategoryId.eq(category_id))
            .order_by_asc(blog_post::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn find_post(&self, post_id: i32) -> Result<Option<blog_post::Model>> {
        Ok(blog_post::Entity::find_by_id(post_id).one(&self.db).await?)
    }

    /// Loads a post only when it is filed under `category_id`.
    pub async fn get_post_in_category(
        &self,
        category_id: i32,
        post_id: i32,
    ) -> Result<blog_post::Model> {
        match self.find_post(post_id).await? {
            Some(post) if post.category_id == category_id => Ok(post),
            _ => Err(AppError::NotFound(format!(
                "post {} in category {}",
                post_id, category_id
            ))),
        }
    }

    pub async fn find_post_by_title(&self, title: &str) -> Result<Option<blog_post::Model>> {
        Ok(blog_post::Entity::find()
            .filter(blog_post::Column::Title.eq(title))
            .one(&self.db)
            .await?)
    }

    pub async fn create_post(
        &self,
        fields: PostFields,
        author_id: i32,
        category_id: i32,
    ) -> Result<blog_post::Model> {
        let post = blog_post::ActiveModel {
            title: Set(fields.title),
            subtitle: Set(fields.subtitle),
            body: Set(fields.body),
            img_url: Set(image_or_default(fields.img_url)),
            date: Set(Utc::now().format(POST_DATE_FORMAT).to_string()),
            author_id: Set(author_id),
            category_id: Set(category_id),
            ..Default::default()
        };

        Ok(post.insert(&self.db).await?)
    }

    pub async fn update_post(&self, post_id: i32, fields: PostFields) -> Result<blog_post::Model> {
        let mut post: blog_post::ActiveModel = self
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?
            .into();
        post.title = Set(fields.title);
        post.subtitle = Set(fields.subtitle);
        post.body = Set(fields.body);
        post.img_url = Set(image_or_default(fields.img_url));

        Ok(post.update(&self.db).await?)
    }

    /// Removes the post after deleting every comment that points at it.
    pub async fn delete_post(&self, post_id: i32) -> Result<()> {
        let txn = self.db.begin().await?;

        let comments = comment::Entity::delete_many()
            .filter(comment::Column::ParentPostId.eq(post_id))
            .exec(&txn)
            .await?;

        let deleted = blog_post::Entity::delete_by_id(post_id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        txn.commit().await?;
        tracing::info!(
            post_id,
            comments = comments.rows_affected,
            "Deleted post"
        );
        Ok(())
    }

    // Comments

    /// Comments under a post, oldest first, each paired with its author when the row exists.
    pub async fn comments_for_post(
        &self,
        post_id: i32,
    ) -> Result<Vec<(comment::Model, Option<user::Model>)>> {
        Ok(comment::Entity::find()
            .filter(comment::Column::ParentPostId.eq(post_id))
            .order_by_asc(comment::Column::Id)
            .find_also_related(user::Entity)
            .all(&self.db)
            .await?)
    }

    pub async fn find_comment(&self, comment_id: i32) -> Result<Option<comment::Model>> {
        Ok(comment::Entity::find_by_id(comment_id).one(&self.db).await?)
    }

    pub async fn create_comment(
        &self,
        text: &str,
        author_id: i32,
        post_id: i32,
    ) -> Result<comment::Model> {
        let comment = comment::ActiveModel {
            text: Set(text.to_string()),
            author_id: Set(author_id),
            parent_post_id: Set(post_id),
            posted_time: Set(Utc::now().format(COMMENT_TIME_FORMAT).to_string()),
            ..Default::default()
        };

        Ok(comment.insert(&self.db).await?)
    }

    pub async fn delete_comment(&self, comment_id: i32) -> Result<()> {
        let deleted = comment::Entity::delete_by_id(comment_id)
            .exec(&self.db)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(AppError::NotFound(format!("comment {}", comment_id)));
        }

        Ok(())
    }
}

fn image_or_default(img_url: Option<String>) -> String {
    img_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string())
}
