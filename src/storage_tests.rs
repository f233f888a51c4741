// ABOUTME: Tests for the storage layer against a migrated temporary SQLite database
// ABOUTME: Covers defaults, lookups, unique constraints and the cascading deletes

#[cfg(test)]
mod tests {
    use super::super::storage::*;
    use crate::entities::{blog_category, blog_post, comment, user};
    use crate::error::AppError;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tempfile::TempDir;

    async fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let storage = Storage::connect(&db_url).await.unwrap();
        (storage, temp_dir)
    }

    async fn create_admin(storage: &Storage) -> user::Model {
        storage
            .create_user("admin", "admin@example.com", "hash")
            .await
            .unwrap()
    }

    fn category_fields(title: &str) -> CategoryFields {
        CategoryFields {
            title: title.to_string(),
            subtitle: "Notes and experiments".to_string(),
            img_url: None,
        }
    }

    fn post_fields(title: &str) -> PostFields {
        PostFields {
            title: title.to_string(),
            subtitle: "A subtitle".to_string(),
            body: "<p>Hello</p>".to_string(),
            img_url: None,
        }
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let (storage, _temp_dir) = create_test_storage().await;
        let admin = create_admin(&storage).await;

        assert_eq!(admin.id, 1);
        let found = storage
            .find_user_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, admin.id);
        assert!(storage
            .find_user_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
        assert!(storage.find_user(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (storage, _temp_dir) = create_test_storage().await;
        create_admin(&storage).await;

        let result = storage
            .create_user("imposter", "admin@example.com", "hash")
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(user::Entity::find().count(&storage.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_image_gets_default() {
        let (storage, _temp_dir) = create_test_storage().await;
        let admin = create_admin(&storage).await;

        let category = storage
            .create_category(category_fields("Rust"), admin.id)
            .await
            .unwrap();
        assert_eq!(category.img_url, DEFAULT_IMAGE_URL);

        let mut fields = post_fields("Ownership");
        fields.img_url = Some("   ".to_string());
        let post = storage
            .create_post(fields, admin.id, category.id)
            .await
            .unwrap();
        assert_eq!(post.img_url, DEFAULT_IMAGE_URL);
        assert_eq!(post.author_id, admin.id);
        assert!(!post.date.is_empty());

        let mut fields = post_fields("Borrowing");
        fields.img_url = Some("https://example.com/borrow.png".to_string());
        let post = storage
            .create_post(fields, admin.id, category.id)
            .await
            .unwrap();
        assert_eq!(post.img_url, "https://example.com/borrow.png");
    }

    #[tokio::test]
    async fn test_update_keeps_author_and_date() {
        let (storage, _temp_dir) = create_test_storage().await;
        let admin = create_admin(&storage).await;
        let category = storage
            .create_category(category_fields("Rust"), admin.id)
            .await
            .unwrap();
        let post = storage
            .create_post(post_fields("Ownership"), admin.id, category.id)
            .await
            .unwrap();

        let mut fields = post_fields("Ownership, revisited");
        fields.body = "<p>Updated</p>".to_string();
        let updated = storage.update_post(post.id, fields).await.unwrap();

        assert_eq!(updated.id, post.id);
        assert_eq!(updated.title, "Ownership, revisited");
        assert_eq!(updated.body, "<p>Updated</p>");
        assert_eq!(updated.date, post.date);
        assert_eq!(updated.author_id, admin.id);
    }

    #[tokio::test]
    async fn test_post_must_belong_to_category() {
        let (storage, _temp_dir) = create_test_storage().await;
        let admin = create_admin(&storage).await;
        let rust = storage
            .create_category(category_fields("Rust"), admin.id)
            .await
            .unwrap();
        let go = storage
            .create_category(category_fields("Go"), admin.id)
            .await
            .unwrap();
        let post = storage
            .create_post(post_fields("Ownership"), admin.id, rust.id)
            .await
            .unwrap();

        assert!(storage.get_post_in_category(rust.id, post.id).await.is_ok());
        assert!(matches!(
            storage.get_post_in_category(go.id, post.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_post_removes_only_its_comments() {
        let (storage, _temp_dir) = create_test_storage().await;
        let admin = create_admin(&storage).await;
        let category = storage
            .create_category(category_fields("Rust"), admin.id)
            .await
            .unwrap();
        let doomed = storage
            .create_post(post_fields("Doomed"), admin.id, category.id)
            .await
            .unwrap();
        let kept = storage
            .create_post(post_fields("Kept"), admin.id, category.id)
            .await
            .unwrap();

        storage.create_comment("first", admin.id, doomed.id).await.unwrap();
        storage.create_comment("second", admin.id, doomed.id).await.unwrap();
        let survivor = storage.create_comment("stays", admin.id, kept.id).await.unwrap();

        storage.delete_post(doomed.id).await.unwrap();

        assert!(storage.find_post(doomed.id).await.unwrap().is_none());
        let remaining = comment::Entity::find().all(&storage.db).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, survivor.id);

        assert!(matches!(
            storage.delete_post(doomed.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_category_cascades() {
        let (storage, _temp_dir) = create_test_storage().await;
        let admin = create_admin(&storage).await;
        let doomed = storage
            .create_category(category_fields("Doomed"), admin.id)
            .await
            .unwrap();
        let kept = storage
            .create_category(category_fields("Kept"), admin.id)
            .await
            .unwrap();
        let post = storage
            .create_post(post_fields("Inside"), admin.id, doomed.id)
            .await
            .unwrap();
        let other = storage
            .create_post(post_fields("Elsewhere"), admin.id, kept.id)
            .await
            .unwrap();
        storage.create_comment("gone", admin.id, post.id).await.unwrap();
        storage.create_comment("stays", admin.id, other.id).await.unwrap();

        storage.delete_category(doomed.id).await.unwrap();

        assert!(storage.find_category(doomed.id).await.unwrap().is_none());
        assert_eq!(
            blog_category::Entity::find().count(&storage.db).await.unwrap(),
            1
        );
        let posts = blog_post::Entity::find().all(&storage.db).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, other.id);
        assert_eq!(comment::Entity::find().count(&storage.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_comments_carry_their_author() {
        let (storage, _temp_dir) = create_test_storage().await;
        let admin = create_admin(&storage).await;
        let reader = storage
            .create_user("reader", "reader@example.com", "hash")
            .await
            .unwrap();
        let category = storage
            .create_category(category_fields("Rust"), admin.id)
            .await
            .unwrap();
        let post = storage
            .create_post(post_fields("Ownership"), admin.id, category.id)
            .await
            .unwrap();

        let created = storage
            .create_comment("Nice write-up", reader.id, post.id)
            .await
            .unwrap();
        let comments = storage.comments_for_post(post.id).await.unwrap();

        assert_eq!(comments.len(), 1);
        let (comment, author) = &comments[0];
        assert_eq!(comment.id, created.id);
        assert_eq!(author.as_ref().unwrap().username, "reader");

        storage.delete_comment(created.id).await.unwrap();
        assert!(storage.find_comment(created.id).await.unwrap().is_none());
        assert!(matches!(
            storage.delete_comment(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
