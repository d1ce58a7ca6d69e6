//! database layer for aerolog.
//!
//! this crate provides persistent storage for:
//! - Users
//! - Devices
//! - Device-user links (and their issued key hashes)
//! - Measurements
//!
//! uniqueness constraints (username, email, device mac, one link per
//! device-user pair) are enforced at the database level so that
//! concurrent writers race safely: exactly one insert wins and the rest
//! observe [`Error::Conflict`].

#![warn(missing_docs)]

mod entity;
mod error;
mod migration;

pub use error::Error;

use std::future::Future;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database as SeaOrmDatabase, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm_migration::MigratorTrait;

use aerolog_types::{
    Config, Device, DeviceId, DeviceUserLink, LinkId, MacAddr, Measurement, User, UserId,
};

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// a page of measurements plus the total row count for the device.
#[derive(Debug, Clone)]
pub struct MeasurementPage {
    /// total number of measurements for the device, ignoring paging.
    pub total: u64,
    /// the requested page, newest first.
    pub items: Vec<Measurement>,
}

/// database trait for aerolog storage operations.
///
/// abstracts over database backends (sqlite, postgresql). deletes are
/// physical; there is no soft-delete layer.
pub trait Database: Send + Sync {
    // ─── Health Check ─────────────────────────────────────────────────────────

    /// ping the database to verify connectivity.
    ///
    /// returns `ok(())` if the database is reachable, `err` otherwise.
    /// used for health checks with a recommended timeout of 1 second.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    // ─── User Operations ─────────────────────────────────────────────────────

    /// create a new user. returns the created user with its assigned id.
    /// a duplicate username or email yields [`Error::Conflict`].
    fn create_user(&self, user: &User) -> impl Future<Output = Result<User>> + Send;

    /// get a user by id.
    fn get_user(&self, id: UserId) -> impl Future<Output = Result<Option<User>>> + Send;

    /// get a user by username (expects the lowercase form).
    fn get_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// get a user by email (expects the lowercase form).
    fn get_user_by_email(&self, email: &str)
        -> impl Future<Output = Result<Option<User>>> + Send;

    /// list all users.
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>>> + Send;

    // ─── Device Operations ───────────────────────────────────────────────────

    /// create a new device. returns the created device with its assigned id.
    /// a duplicate mac yields [`Error::Conflict`].
    fn create_device(&self, device: &Device) -> impl Future<Output = Result<Device>> + Send;

    /// get a device by id.
    fn get_device(&self, id: DeviceId) -> impl Future<Output = Result<Option<Device>>> + Send;

    /// get a device by its canonical mac address.
    fn get_device_by_mac(
        &self,
        mac: &MacAddr,
    ) -> impl Future<Output = Result<Option<Device>>> + Send;

    /// list all devices registered by a user.
    fn list_devices_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Device>>> + Send;

    /// update the `last_seen_at` timestamp for a device.
    ///
    /// last-writer-wins; callers treat failures as non-fatal.
    fn touch_device_last_seen(
        &self,
        id: DeviceId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<()>> + Send;

    // ─── Device-User Link Operations ─────────────────────────────────────────

    /// create a new keyless link. a duplicate (device, user) pair yields
    /// [`Error::Conflict`].
    fn create_link(
        &self,
        link: &DeviceUserLink,
    ) -> impl Future<Output = Result<DeviceUserLink>> + Send;

    /// get a link by id.
    fn get_link(&self, id: LinkId) -> impl Future<Output = Result<Option<DeviceUserLink>>> + Send;

    /// get the link for a specific (device, user) pair.
    fn find_link(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<DeviceUserLink>>> + Send;

    /// list all links for a device, oldest link (lowest id) first.
    fn list_links_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceUserLink>>> + Send;

    /// store the hash of a freshly issued key on a link, but only if no
    /// key has been issued yet.
    ///
    /// returns `true` if the hash was written, `false` if the link was
    /// already keyed (or does not exist). this is the issue-once gate:
    /// two racing enrollments both pass the read check, but only one
    /// write lands.
    fn set_link_key_hash(
        &self,
        id: LinkId,
        key_hash: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    // ─── Measurement Operations ──────────────────────────────────────────────

    /// store a measurement. returns it with its assigned id.
    fn create_measurement(
        &self,
        measurement: &Measurement,
    ) -> impl Future<Output = Result<Measurement>> + Send;

    /// page through a device's measurements, newest first.
    fn list_measurements_for_device(
        &self,
        device_id: DeviceId,
        limit: u64,
        offset: u64,
    ) -> impl Future<Output = Result<MeasurementPage>> + Send;

    /// the most recent measurement for a device, if any.
    fn latest_measurement_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Option<Measurement>>> + Send;

    /// the most recent measurements across all of a user's devices,
    /// newest first.
    fn recent_measurements_for_user(
        &self,
        user_id: UserId,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Measurement>>> + Send;

    /// the most recent measurements across every device, newest first.
    fn recent_measurements(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Measurement>>> + Send;
}

/// the main database implementation using sea-orm.
#[derive(Clone)]
pub struct AerologDb {
    conn: DatabaseConnection,
}

impl AerologDb {
    /// create a new database connection from config.
    pub async fn new(config: &Config) -> Result<Self> {
        let url = Self::build_connection_url(&config.database)?;
        let conn: DatabaseConnection = SeaOrmDatabase::connect(&url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };

        // enable WAL mode for sqlite if configured
        if config.database.db_type == "sqlite" && config.database.sqlite.write_ahead_log {
            db.enable_wal_mode().await?;
        }

        db.migrate().await?;
        Ok(db)
    }

    /// enable write-ahead logging mode for sqlite.
    ///
    /// WAL mode allows concurrent reads during writes. must be called
    /// before any writes.
    async fn enable_wal_mode(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("PRAGMA journal_mode=WAL")
            .await
            .map_err(|e| Error::Connection(format!("failed to enable WAL mode: {}", e)))?;
        tracing::info!("sqlite WAL mode enabled");
        Ok(())
    }

    /// build a sea-orm compatible connection url from config.
    fn build_connection_url(config: &aerolog_types::DatabaseConfig) -> Result<String> {
        match config.db_type.as_str() {
            "sqlite" => {
                let path = if config.connection_string.starts_with("sqlite:") {
                    config.connection_string.clone()
                } else {
                    format!("sqlite:{}", config.connection_string)
                };
                // add ?mode=rwc to create file if it doesn't exist
                if path.contains('?') {
                    Ok(path)
                } else {
                    Ok(format!("{}?mode=rwc", path))
                }
            }
            "postgres" | "postgresql" => Ok(config.connection_string.clone()),
            other => Err(Error::InvalidData(format!(
                "unsupported database type: {}",
                other
            ))),
        }
    }

    /// create an in-memory sqlite database for testing.
    pub async fn new_in_memory() -> Result<Self> {
        let conn: DatabaseConnection = SeaOrmDatabase::connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }
}

impl Database for AerologDb {
    // health check

    async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    // user operations

    async fn create_user(&self, user: &User) -> Result<User> {
        let model: entity::user::ActiveModel = user.into();
        let result = model.insert(&self.conn).await.map_err(Error::from_insert)?;
        Ok(result.into())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let result = entity::user::Entity::find_by_id(id.0 as i64)
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let result = entity::user::Entity::find()
            .filter(entity::user::Column::Username.eq(username))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let result = entity::user::Entity::find()
            .filter(entity::user::Column::Email.eq(email))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let results = entity::user::Entity::find().all(&self.conn).await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    // device operations

    async fn create_device(&self, device: &Device) -> Result<Device> {
        let model: entity::device::ActiveModel = device.into();
        let result = model.insert(&self.conn).await.map_err(Error::from_insert)?;
        result.try_into()
    }

    async fn get_device(&self, id: DeviceId) -> Result<Option<Device>> {
        let result = entity::device::Entity::find_by_id(id.0 as i64)
            .one(&self.conn)
            .await?;
        result.map(Device::try_from).transpose()
    }

    async fn get_device_by_mac(&self, mac: &MacAddr) -> Result<Option<Device>> {
        let result = entity::device::Entity::find()
            .filter(entity::device::Column::Mac.eq(mac.as_str()))
            .one(&self.conn)
            .await?;
        result.map(Device::try_from).transpose()
    }

    async fn list_devices_for_user(&self, user_id: UserId) -> Result<Vec<Device>> {
        let results = entity::device::Entity::find()
            .filter(entity::device::Column::UserId.eq(user_id.0 as i64))
            .order_by_asc(entity::device::Column::Id)
            .all(&self.conn)
            .await?;
        results.into_iter().map(Device::try_from).collect()
    }

    async fn touch_device_last_seen(&self, id: DeviceId, at: DateTime<Utc>) -> Result<()> {
        entity::device::Entity::update_many()
            .col_expr(
                entity::device::Column::LastSeenAt,
                sea_orm::sea_query::Expr::value(at),
            )
            .filter(entity::device::Column::Id.eq(id.0 as i64))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // device-user link operations

    async fn create_link(&self, link: &DeviceUserLink) -> Result<DeviceUserLink> {
        let model: entity::device_user::ActiveModel = link.into();
        let result = model.insert(&self.conn).await.map_err(Error::from_insert)?;
        Ok(result.into())
    }

    async fn get_link(&self, id: LinkId) -> Result<Option<DeviceUserLink>> {
        let result = entity::device_user::Entity::find_by_id(id.0 as i64)
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn find_link(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> Result<Option<DeviceUserLink>> {
        let result = entity::device_user::Entity::find()
            .filter(entity::device_user::Column::DeviceId.eq(device_id.0 as i64))
            .filter(entity::device_user::Column::UserId.eq(user_id.0 as i64))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_links_for_device(&self, device_id: DeviceId) -> Result<Vec<DeviceUserLink>> {
        let results = entity::device_user::Entity::find()
            .filter(entity::device_user::Column::DeviceId.eq(device_id.0 as i64))
            .order_by_asc(entity::device_user::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn set_link_key_hash(&self, id: LinkId, key_hash: &str) -> Result<bool> {
        let result = entity::device_user::Entity::update_many()
            .col_expr(
                entity::device_user::Column::ApiKeyHash,
                sea_orm::sea_query::Expr::value(key_hash),
            )
            .filter(entity::device_user::Column::Id.eq(id.0 as i64))
            .filter(entity::device_user::Column::ApiKeyHash.is_null())
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    // measurement operations

    async fn create_measurement(&self, measurement: &Measurement) -> Result<Measurement> {
        let model: entity::measurement::ActiveModel = measurement.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn list_measurements_for_device(
        &self,
        device_id: DeviceId,
        limit: u64,
        offset: u64,
    ) -> Result<MeasurementPage> {
        let filter = entity::measurement::Column::DeviceId.eq(device_id.0 as i64);

        let total = entity::measurement::Entity::find()
            .filter(filter.clone())
            .count(&self.conn)
            .await?;

        let results = entity::measurement::Entity::find()
            .filter(filter)
            .order_by_desc(entity::measurement::Column::RecordedAt)
            .order_by_desc(entity::measurement::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?;

        Ok(MeasurementPage {
            total,
            items: results.into_iter().map(Into::into).collect(),
        })
    }

    async fn latest_measurement_for_device(
        &self,
        device_id: DeviceId,
    ) -> Result<Option<Measurement>> {
        let result = entity::measurement::Entity::find()
            .filter(entity::measurement::Column::DeviceId.eq(device_id.0 as i64))
            .order_by_desc(entity::measurement::Column::RecordedAt)
            .order_by_desc(entity::measurement::Column::Id)
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn recent_measurements_for_user(
        &self,
        user_id: UserId,
        limit: u64,
    ) -> Result<Vec<Measurement>> {
        let results = entity::measurement::Entity::find()
            .filter(entity::measurement::Column::UserId.eq(user_id.0 as i64))
            .order_by_desc(entity::measurement::Column::RecordedAt)
            .order_by_desc(entity::measurement::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn recent_measurements(&self, limit: u64) -> Result<Vec<Measurement>> {
        let results = entity::measurement::Entity::find()
            .order_by_desc(entity::measurement::Column::RecordedAt)
            .order_by_desc(entity::measurement::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerolog_types::DeviceKeyToken;

    async fn setup_test_db() -> AerologDb {
        AerologDb::new_in_memory().await.unwrap()
    }

    fn test_user(name: &str) -> User {
        User::new(name, &format!("{}@example.com", name), "hash".to_string())
    }

    async fn seed_user(db: &AerologDb, name: &str) -> User {
        db.create_user(&test_user(name)).await.unwrap()
    }

    async fn seed_device(db: &AerologDb, mac: &str, user_id: UserId) -> Device {
        let mac = MacAddr::parse(mac).unwrap();
        db.create_device(&Device::auto_registered(mac, user_id))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let db = setup_test_db().await;
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_user_crud() {
        let db = setup_test_db().await;

        let created = seed_user(&db, "alice").await;
        assert!(created.id.0 > 0);

        let fetched = db.get_user(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.email, "alice@example.com");

        let by_name = db.get_user_by_username("alice").await.unwrap();
        assert!(by_name.is_some());

        let by_email = db.get_user_by_email("alice@example.com").await.unwrap();
        assert!(by_email.is_some());

        assert!(db.get_user_by_username("bob").await.unwrap().is_none());

        let users = db.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let db = setup_test_db().await;
        seed_user(&db, "alice").await;

        let dup = User::new("alice", "other@example.com", "hash".to_string());
        let result = db.create_user(&dup).await;
        assert!(matches!(result, Err(Error::Conflict)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let db = setup_test_db().await;
        seed_user(&db, "alice").await;

        let dup = User::new("alice2", "alice@example.com", "hash".to_string());
        let result = db.create_user(&dup).await;
        assert!(matches!(result, Err(Error::Conflict)));
    }

    #[tokio::test]
    async fn test_device_crud() {
        let db = setup_test_db().await;
        let user = seed_user(&db, "alice").await;

        let created = seed_device(&db, "aa:bb:cc:dd:ee:ff", user.id).await;
        assert!(created.id.0 > 0);
        assert_eq!(created.mac, "AA:BB:CC:DD:EE:FF");

        let mac = MacAddr::parse("AA-BB-CC-DD-EE-FF").unwrap();
        let by_mac = db.get_device_by_mac(&mac).await.unwrap().unwrap();
        assert_eq!(by_mac.id, created.id);

        let listed = db.list_devices_for_user(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_mac_conflicts() {
        let db = setup_test_db().await;
        let user = seed_user(&db, "alice").await;
        seed_device(&db, "aa:bb:cc:dd:ee:ff", user.id).await;

        let mac = MacAddr::parse("aabbccddeeff").unwrap();
        let result = db.create_device(&Device::auto_registered(mac, user.id)).await;
        assert!(matches!(result, Err(Error::Conflict)));
    }

    #[tokio::test]
    async fn test_touch_device_last_seen() {
        let db = setup_test_db().await;
        let user = seed_user(&db, "alice").await;
        let device = seed_device(&db, "aa:bb:cc:dd:ee:ff", user.id).await;
        assert!(device.last_seen_at.is_none());

        let now = Utc::now();
        db.touch_device_last_seen(device.id, now).await.unwrap();

        let fetched = db.get_device(device.id).await.unwrap().unwrap();
        assert!(fetched.last_seen_at.is_some());
    }

    #[tokio::test]
    async fn test_link_crud_and_uniqueness() {
        let db = setup_test_db().await;
        let user = seed_user(&db, "alice").await;
        let device = seed_device(&db, "aa:bb:cc:dd:ee:ff", user.id).await;

        let link = db
            .create_link(&DeviceUserLink::new(device.id, user.id))
            .await
            .unwrap();
        assert!(link.id.0 > 0);
        assert!(!link.is_keyed());

        let found = db.find_link(device.id, user.id).await.unwrap().unwrap();
        assert_eq!(found.id, link.id);

        // second link for the same pair loses the race
        let result = db.create_link(&DeviceUserLink::new(device.id, user.id)).await;
        assert!(matches!(result, Err(Error::Conflict)));
    }

    #[tokio::test]
    async fn test_set_link_key_hash_is_issue_once() {
        let db = setup_test_db().await;
        let user = seed_user(&db, "alice").await;
        let device = seed_device(&db, "aa:bb:cc:dd:ee:ff", user.id).await;
        let link = db
            .create_link(&DeviceUserLink::new(device.id, user.id))
            .await
            .unwrap();

        let token = DeviceKeyToken::generate();
        let wrote = db.set_link_key_hash(link.id, &token.hash_hex()).await.unwrap();
        assert!(wrote);

        // second attempt finds the link already keyed
        let other = DeviceKeyToken::generate();
        let wrote = db.set_link_key_hash(link.id, &other.hash_hex()).await.unwrap();
        assert!(!wrote);

        // stored hash is the first one
        let fetched = db.get_link(link.id).await.unwrap().unwrap();
        assert!(fetched.verify_key(&token));
        assert!(!fetched.verify_key(&other));
    }

    #[tokio::test]
    async fn test_links_for_device_ordered_by_id() {
        let db = setup_test_db().await;
        let alice = seed_user(&db, "alice").await;
        let bob = seed_user(&db, "bob").await;
        let device = seed_device(&db, "aa:bb:cc:dd:ee:ff", alice.id).await;

        let first = db
            .create_link(&DeviceUserLink::new(device.id, alice.id))
            .await
            .unwrap();
        let second = db
            .create_link(&DeviceUserLink::new(device.id, bob.id))
            .await
            .unwrap();

        let links = db.list_links_for_device(device.id).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].id, first.id);
        assert_eq!(links[1].id, second.id);
    }

    #[tokio::test]
    async fn test_measurement_paging() {
        let db = setup_test_db().await;
        let user = seed_user(&db, "alice").await;
        let device = seed_device(&db, "aa:bb:cc:dd:ee:ff", user.id).await;
        let link = db
            .create_link(&DeviceUserLink::new(device.id, user.id))
            .await
            .unwrap();

        for i in 0..5 {
            let m = Measurement::new(device.id, user.id, link.id, 400.0 + i as f64, 21.0, 45.0)
                .unwrap();
            db.create_measurement(&m).await.unwrap();
        }

        let page = db
            .list_measurements_for_device(device.id, 2, 0)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        // newest first
        assert_eq!(page.items[0].co2, 404.0);

        let page = db
            .list_measurements_for_device(device.id, 2, 4)
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].co2, 400.0);

        let latest = db
            .latest_measurement_for_device(device.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.co2, 404.0);

        let recent = db.recent_measurements_for_user(user.id, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].co2, 404.0);

        let all_recent = db.recent_measurements(10).await.unwrap();
        assert_eq!(all_recent.len(), 5);
    }

    #[tokio::test]
    async fn test_latest_for_empty_device() {
        let db = setup_test_db().await;
        let user = seed_user(&db, "alice").await;
        let device = seed_device(&db, "aa:bb:cc:dd:ee:ff", user.id).await;

        let latest = db.latest_measurement_for_device(device.id).await.unwrap();
        assert!(latest.is_none());
    }
}
