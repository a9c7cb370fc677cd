use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use indexmap::IndexMap;
use tracing::{debug, info};

use health_tracker_data::models::{Device, DeviceType, HealthData};
use health_tracker_data::repository::{
    DeviceRepositoryTrait, HealthDataFilter, HealthDataRepositoryTrait, RepositoryError, UserRepositoryTrait,
};

use super::{validate_request, ServiceError};
use crate::clients::Summarizer;
use crate::config::AggregationConfig;
use crate::entities::conversions;
use crate::entities::{HealthDataQuery, HealthDataRequest};

/// Trait for health data aggregation, visibility and ingestion
#[async_trait]
pub trait HealthDataServiceTrait: Send + Sync {
    /// Records of one device type measured within `[now - window, now]`
    async fn fetch_recent_by_device_type(
        &self,
        device_type: DeviceType,
        window: Duration,
    ) -> Result<Vec<HealthData>, ServiceError>;

    /// Recent records for every configured device type, keyed by its label
    /// in configured order
    async fn fetch_health_data(&self) -> Result<IndexMap<String, Vec<HealthData>>, ServiceError>;

    /// Set the visibility flag of every stored record and persist them all
    async fn update_visibility(&self, is_public: bool) -> Result<Vec<HealthData>, ServiceError>;

    /// Public records measured within the configured window
    async fn fetch_public_data(&self) -> Result<Vec<HealthData>, ServiceError>;

    /// Validate and persist a batch of measurements atomically
    async fn ingest(&self, requests: Vec<HealthDataRequest>) -> Result<Vec<HealthData>, ServiceError>;

    /// Validate and persist a single measurement
    async fn ingest_one(&self, request: HealthDataRequest) -> Result<HealthData, ServiceError>;

    /// Measurements from the devices of a user
    async fn fetch_user_health_data(
        &self,
        user_id: i64,
        query: HealthDataQuery,
    ) -> Result<Vec<HealthData>, ServiceError>;

    /// Measurements from one device
    async fn fetch_device_health_data(
        &self,
        device_id: i64,
        query: HealthDataQuery,
    ) -> Result<Vec<HealthData>, ServiceError>;

    /// Text summary of the recent records of every configured device type
    async fn summarize(&self) -> Result<String, ServiceError>;
}

/// Aggregation service backed by the repositories and a summarizer
pub struct HealthDataService {
    health_data: Arc<dyn HealthDataRepositoryTrait>,
    devices: Arc<dyn DeviceRepositoryTrait>,
    users: Arc<dyn UserRepositoryTrait>,
    summarizer: Arc<dyn Summarizer>,
    config: AggregationConfig,
}

impl HealthDataService {
    pub fn new(
        health_data: Arc<dyn HealthDataRepositoryTrait>,
        devices: Arc<dyn DeviceRepositoryTrait>,
        users: Arc<dyn UserRepositoryTrait>,
        summarizer: Arc<dyn Summarizer>,
        config: AggregationConfig,
    ) -> Self {
        Self {
            health_data,
            devices,
            users,
            summarizer,
            config,
        }
    }

    /// Look up every device referenced by the requests once.
    ///
    /// An unknown device id is a dangling reference, not a missing resource.
    async fn referenced_devices(&self, requests: &[HealthDataRequest]) -> Result<HashMap<i64, Device>, ServiceError> {
        let mut devices = HashMap::new();
        for device_id in requests.iter().filter_map(|request| request.device_id) {
            if devices.contains_key(&device_id) {
                continue;
            }
            let device = self.devices.find_by_id(device_id).await.map_err(|err| match err {
                RepositoryError::NotFound { .. } => {
                    ServiceError::ConstraintViolation(format!("device {} does not exist", device_id))
                }
                other => other.into(),
            })?;
            devices.insert(device_id, device);
        }
        Ok(devices)
    }

    fn to_records(
        requests: Vec<HealthDataRequest>,
        devices: &HashMap<i64, Device>,
    ) -> Result<Vec<HealthData>, ServiceError> {
        requests
            .into_iter()
            .map(|request| {
                let device = request.device_id.and_then(|id| devices.get(&id));
                conversions::convert_to_data_health_data(request, device)
            })
            .collect()
    }

    /// Start of the trailing window ending at `now`
    fn window_start(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>, ServiceError> {
        if window < Duration::zero() {
            return Err(ServiceError::Validation("window must not be negative".to_string()));
        }
        now.checked_sub_signed(window)
            .ok_or_else(|| ServiceError::Validation(format!("window of {} days is out of range", window.num_days())))
    }

    fn query_filter(query: HealthDataQuery, filter: HealthDataFilter) -> Result<HealthDataFilter, ServiceError> {
        if let (Some(start), Some(end)) = (query.start, query.end) {
            if start > end {
                return Err(ServiceError::Validation("start must not be after end".to_string()));
            }
        }
        Ok(HealthDataFilter {
            data_type: query.data_type,
            measured_from: query.start,
            measured_to: query.end,
            ..filter
        })
    }
}

#[async_trait]
impl HealthDataServiceTrait for HealthDataService {
    async fn fetch_recent_by_device_type(
        &self,
        device_type: DeviceType,
        window: Duration,
    ) -> Result<Vec<HealthData>, ServiceError> {
        let now = Utc::now();
        let filter = HealthDataFilter::new()
            .device_type(device_type)
            .measured_between(Self::window_start(now, window)?, now);
        let records = self.health_data.find_filtered(&filter).await?;
        debug!("Found {} recent {} records", records.len(), device_type);
        Ok(records)
    }

    async fn fetch_health_data(&self) -> Result<IndexMap<String, Vec<HealthData>>, ServiceError> {
        let window = self.config.window();
        let lists = try_join_all(
            self.config
                .device_types
                .iter()
                .map(|device_type| self.fetch_recent_by_device_type(*device_type, window)),
        )
        .await?;

        Ok(self
            .config
            .device_types
            .iter()
            .map(|device_type| device_type.to_string())
            .zip(lists)
            .collect())
    }

    async fn update_visibility(&self, is_public: bool) -> Result<Vec<HealthData>, ServiceError> {
        let records: Vec<HealthData> = self
            .health_data
            .find_all()
            .await?
            .into_iter()
            .map(|mut record| {
                record.is_public = is_public;
                record
            })
            .collect();

        let saved = self.health_data.save_all(records).await?;
        info!("Set is_public={} on {} records", is_public, saved.len());
        Ok(saved)
    }

    async fn fetch_public_data(&self) -> Result<Vec<HealthData>, ServiceError> {
        let now = Utc::now();
        let filter = HealthDataFilter::new()
            .public_only()
            .measured_between(Self::window_start(now, self.config.window())?, now);
        Ok(self.health_data.find_filtered(&filter).await?)
    }

    async fn ingest(&self, requests: Vec<HealthDataRequest>) -> Result<Vec<HealthData>, ServiceError> {
        for request in &requests {
            validate_request(request)?;
        }
        let devices = self.referenced_devices(&requests).await?;
        let records = Self::to_records(requests, &devices)?;

        let saved = self.health_data.save_all(records).await?;
        info!("Ingested {} health data records", saved.len());
        Ok(saved)
    }

    async fn ingest_one(&self, request: HealthDataRequest) -> Result<HealthData, ServiceError> {
        validate_request(&request)?;
        let devices = self.referenced_devices(std::slice::from_ref(&request)).await?;
        let device = request.device_id.and_then(|id| devices.get(&id));
        let record = conversions::convert_to_data_health_data(request, device)?;

        let saved = self.health_data.save(record).await?;
        info!("Ingested health data record {:?}", saved.id);
        Ok(saved)
    }

    async fn fetch_user_health_data(
        &self,
        user_id: i64,
        query: HealthDataQuery,
    ) -> Result<Vec<HealthData>, ServiceError> {
        self.users.find_by_id(user_id).await?;
        let filter = Self::query_filter(query, HealthDataFilter::new().user_id(user_id))?;
        Ok(self.health_data.find_filtered(&filter).await?)
    }

    async fn fetch_device_health_data(
        &self,
        device_id: i64,
        query: HealthDataQuery,
    ) -> Result<Vec<HealthData>, ServiceError> {
        self.devices.find_by_id(device_id).await?;
        let filter = Self::query_filter(query, HealthDataFilter::new().device_id(device_id))?;
        Ok(self.health_data.find_filtered(&filter).await?)
    }

    async fn summarize(&self) -> Result<String, ServiceError> {
        let data = self.fetch_health_data().await?;
        Ok(self.summarizer.summarize(&data).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::completion::MockSummarizer;
    use health_tracker_data::models::{DataType, User, UserRole};
    use health_tracker_data::repository::{InMemoryStorage, Repository};
    use mockall::predicate::always;

    struct Fixture {
        storage: Arc<InMemoryStorage>,
        service: HealthDataService,
        user_id: i64,
        watch_id: i64,
        hub_id: i64,
    }

    async fn fixture_with(summarizer: MockSummarizer) -> Fixture {
        let storage = Arc::new(InMemoryStorage::new());
        let user = storage.save(User::new("judy", UserRole::User)).await.unwrap();
        let user_id = user.id.unwrap();

        let device = |device_type, name: &str| Device {
            id: None,
            user_id,
            device_type,
            device_name: name.to_string(),
            registered_at: Utc::now(),
            last_sync_at: None,
        };
        let watch = storage.save(device(DeviceType::Smartwatch, "Watch")).await.unwrap();
        let hub = storage.save(device(DeviceType::HealthHub, "Hub")).await.unwrap();

        let service = HealthDataService::new(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            Arc::new(summarizer),
            AggregationConfig::default(),
        );

        Fixture {
            storage,
            service,
            user_id,
            watch_id: watch.id.unwrap(),
            hub_id: hub.id.unwrap(),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_window_is_rejected() {
        let f = fixture().await;

        let result = f
            .service
            .fetch_recent_by_device_type(DeviceType::Smartwatch, Duration::days(100_000_000))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));

        let result = f
            .service
            .fetch_recent_by_device_type(DeviceType::Smartwatch, Duration::days(-1))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_oversized_configured_window_fails_without_panicking() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = HealthDataService::new(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            Arc::new(MockSummarizer::new()),
            AggregationConfig {
                window_days: 100_000_000,
                ..AggregationConfig::default()
            },
        );

        assert!(matches!(service.fetch_health_data().await, Err(ServiceError::Validation(_))));
        assert!(matches!(service.fetch_public_data().await, Err(ServiceError::Validation(_))));
    }

    async fn fixture() -> Fixture {
        fixture_with(MockSummarizer::new()).await
    }

    fn measurement(device_id: i64, age: Duration, data_type: DataType) -> HealthDataRequest {
        HealthDataRequest {
            device_id: Some(device_id),
            measured_at: Some(Utc::now() - age),
            data_type: Some(data_type),
            value_numeric: Some(1.0),
            ..HealthDataRequest::default()
        }
    }

    #[tokio::test]
    async fn test_recent_window_excludes_old_records() {
        let f = fixture().await;
        f.service
            .ingest(vec![
                measurement(f.watch_id, Duration::zero(), DataType::Steps),
                measurement(f.watch_id, Duration::days(3), DataType::Steps),
                measurement(f.watch_id, Duration::days(10), DataType::Steps),
            ])
            .await
            .unwrap();

        let recent = f
            .service
            .fetch_recent_by_device_type(DeviceType::Smartwatch, Duration::days(7))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|r| r.measured_at > Utc::now() - Duration::days(7)));
    }

    #[tokio::test]
    async fn test_fetch_health_data_keys_follow_configuration() {
        let f = fixture().await;
        f.service
            .ingest(vec![
                measurement(f.hub_id, Duration::hours(1), DataType::Co2),
                measurement(f.watch_id, Duration::hours(2), DataType::Heartbeat),
            ])
            .await
            .unwrap();

        let data = f.service.fetch_health_data().await.unwrap();
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["SMARTWATCH", "HEALTH_HUB"]);
        assert_eq!(data["SMARTWATCH"][0].data_type, DataType::Heartbeat);
        assert_eq!(data["HEALTH_HUB"][0].data_type, DataType::Co2);
    }

    #[tokio::test]
    async fn test_update_visibility_is_idempotent_and_covers_everything() {
        let f = fixture().await;
        f.service
            .ingest(vec![
                measurement(f.watch_id, Duration::hours(1), DataType::Steps),
                measurement(f.hub_id, Duration::days(30), DataType::RoomTemperature),
            ])
            .await
            .unwrap();

        let first = f.service.update_visibility(true).await.unwrap();
        let second = f.service.update_visibility(true).await.unwrap();
        assert_eq!(first, second);

        let stored: Vec<HealthData> = f.storage.find_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|r| r.is_public));
    }

    #[tokio::test]
    async fn test_public_data_is_recent_and_public() {
        let f = fixture().await;
        let mut public = measurement(f.watch_id, Duration::hours(1), DataType::Steps);
        public.is_public = Some(true);
        let mut old_public = measurement(f.hub_id, Duration::days(8), DataType::AirQuality);
        old_public.is_public = Some(true);
        let private = measurement(f.hub_id, Duration::hours(1), DataType::AirQuality);
        f.service.ingest(vec![public, old_public, private]).await.unwrap();

        let found = f.service.fetch_public_data().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].device_type, DeviceType::Smartwatch);

        let mut recent_public: Vec<HealthData> = Vec::new();
        for device_type in DeviceType::ALL {
            let recent = f
                .service
                .fetch_recent_by_device_type(device_type, Duration::days(7))
                .await
                .unwrap();
            recent_public.extend(recent.into_iter().filter(|r| r.is_public));
        }
        assert!(found.iter().all(|r| recent_public.contains(r)));
    }

    #[tokio::test]
    async fn test_ingest_rejects_missing_value_and_unknown_device() {
        let f = fixture().await;
        let mut missing = measurement(f.watch_id, Duration::zero(), DataType::Steps);
        missing.value_numeric = None;
        assert!(matches!(
            f.service.ingest(vec![missing]).await,
            Err(ServiceError::Validation(_))
        ));

        let dangling = measurement(404, Duration::zero(), DataType::Steps);
        assert!(matches!(
            f.service.ingest_one(dangling).await,
            Err(ServiceError::ConstraintViolation(_))
        ));

        let stored: Vec<HealthData> = f.storage.find_all().await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let f = fixture().await;
        let mut conflicting = measurement(f.hub_id, Duration::zero(), DataType::Steps);
        conflicting.device_type = Some(DeviceType::Smartwatch);

        let result = f
            .service
            .ingest(vec![measurement(f.watch_id, Duration::zero(), DataType::Steps), conflicting])
            .await;
        assert!(matches!(result, Err(ServiceError::ConstraintViolation(_))));
        let stored: Vec<HealthData> = f.storage.find_all().await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_user_and_device_queries() {
        let f = fixture().await;
        f.service
            .ingest(vec![
                measurement(f.watch_id, Duration::hours(5), DataType::Steps),
                measurement(f.watch_id, Duration::hours(1), DataType::Heartbeat),
                measurement(f.hub_id, Duration::hours(1), DataType::Co2),
            ])
            .await
            .unwrap();

        let all = f
            .service
            .fetch_user_health_data(f.user_id, HealthDataQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let heartbeats = f
            .service
            .fetch_user_health_data(
                f.user_id,
                HealthDataQuery {
                    data_type: Some(DataType::Heartbeat),
                    ..HealthDataQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(heartbeats.len(), 1);

        let recent_watch = f
            .service
            .fetch_device_health_data(
                f.watch_id,
                HealthDataQuery {
                    start: Some(Utc::now() - Duration::hours(2)),
                    end: Some(Utc::now()),
                    ..HealthDataQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(recent_watch.len(), 1);
        assert_eq!(recent_watch[0].data_type, DataType::Heartbeat);

        assert!(matches!(
            f.service.fetch_user_health_data(77, HealthDataQuery::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.fetch_device_health_data(77, HealthDataQuery::default()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let f = fixture().await;
        let query = HealthDataQuery {
            start: Some(Utc::now()),
            end: Some(Utc::now() - Duration::days(1)),
            ..HealthDataQuery::default()
        };
        assert!(matches!(
            f.service.fetch_user_health_data(f.user_id, query).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_summarize_passes_windowed_data_to_summarizer() {
        let mut summarizer = MockSummarizer::new();
        summarizer
            .expect_summarize()
            .with(always())
            .times(1)
            .returning(|data| format!("{} device types", data.len()));

        let f = fixture_with(summarizer).await;
        assert_eq!(f.service.summarize().await.unwrap(), "2 device types");
    }
}
