//! Cache-aside enrichment of local records with courier profiles.
//!
//! Every call runs the same linear pipeline:
//!
//! 1. Collect the distinct courier ids. No ids, no lookups.
//! 2. Ask the users service for all of them in one batch request.
//! 3. On success, schedule a cache write per returned profile without waiting
//!    for it, and merge.
//! 4. On any remote failure, read every id from the cache in one multi-get.
//!    Unless every id is present and decodable the whole call fails.
//!
//! The remote answer is authoritative: a courier it omits has no profile and
//! the record is returned with `courier: null`. The cache is only a stand-in,
//! so an incomplete cache answer is treated as no answer at all.

use bytes::Bytes;
use resilient::ClientFactory;
use serde::Serialize;
use shared::counter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::config::RemoteConfig;
use crate::errors::{EnrichError, FallbackFailure, RemoteFailure};
use crate::keys::cache_key;
use crate::merge::{ProfileIndex, distinct_ids, merge, missing_ids};
use crate::metrics_defs::{
    CACHE_FALLBACK_HIT, CACHE_FALLBACK_MISS, CACHE_WRITE_FAILED, ENRICHMENTS,
    REMOTE_PROFILES_MISSING,
};
use crate::types::{CourierId, CourierProfile, Enriched, ForeignKeyed, Listing};

/// Lifetime of a cached profile.
pub const PROFILE_TTL: Duration = Duration::from_secs(3600);

#[derive(Serialize)]
struct JoinRequest<'a> {
    data: &'a [CourierId],
}

/// Where the profiles of one enrichment came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileSource {
    /// Nothing needed looking up.
    None,
    Remote,
    Cache,
}

impl ProfileSource {
    fn as_str(&self) -> &'static str {
        match self {
            ProfileSource::None => "none",
            ProfileSource::Remote => "remote",
            ProfileSource::Cache => "cache",
        }
    }
}

pub struct Enricher {
    clients: ClientFactory,
    cache: Arc<dyn CacheStore>,
    remote: RemoteConfig,
}

impl Enricher {
    pub fn new(clients: ClientFactory, cache: Arc<dyn CacheStore>, remote: RemoteConfig) -> Self {
        Enricher {
            clients,
            cache,
            remote,
        }
    }

    pub async fn enrich_one<R: ForeignKeyed>(&self, record: R) -> Result<Enriched<R>, EnrichError> {
        let ids = distinct_ids(std::slice::from_ref(&record));
        let (profiles, _) = self.profiles(&ids).await?;
        Ok(ProfileIndex::new(profiles).enrich(record))
    }

    pub async fn enrich_many<R: ForeignKeyed>(
        &self,
        records: Vec<R>,
    ) -> Result<Vec<Enriched<R>>, EnrichError> {
        let ids = distinct_ids(&records);
        let (profiles, _) = self.profiles(&ids).await?;
        Ok(merge(records, profiles))
    }

    /// Enriches the records of a page or search result, keeping its metadata.
    pub async fn enrich_listing<R: ForeignKeyed>(
        &self,
        mut listing: Listing<R>,
    ) -> Result<Listing<Enriched<R>>, EnrichError> {
        let records = std::mem::take(&mut listing.data);
        let enriched = self.enrich_many(records).await?;
        Ok(listing.with_data(enriched))
    }

    /// Profiles for `ids`: from the users service, or from the cache when the
    /// service cannot answer.
    pub(crate) async fn profiles(
        &self,
        ids: &[CourierId],
    ) -> Result<(Vec<CourierProfile>, ProfileSource), EnrichError> {
        if ids.is_empty() {
            counter!(ENRICHMENTS, "source" => ProfileSource::None.as_str()).increment(1);
            return Ok((Vec::new(), ProfileSource::None));
        }

        let remote = match self.fetch_remote(ids).await {
            Ok(profiles) => {
                let missing = missing_ids(ids, &profiles);
                if !missing.is_empty() {
                    counter!(REMOTE_PROFILES_MISSING).increment(missing.len() as u64);
                    tracing::warn!(
                        service = %self.remote.service,
                        ?missing,
                        "users service omitted requested couriers"
                    );
                }

                self.write_through(&profiles);
                counter!(ENRICHMENTS, "source" => ProfileSource::Remote.as_str()).increment(1);
                return Ok((profiles, ProfileSource::Remote));
            }
            Err(failure) => failure,
        };

        tracing::warn!(
            service = %self.remote.service,
            error = %remote,
            "fetching courier profiles failed, falling back to cache"
        );

        match self.read_cache(ids).await {
            Ok(profiles) => {
                counter!(ENRICHMENTS, "source" => ProfileSource::Cache.as_str()).increment(1);
                Ok((profiles, ProfileSource::Cache))
            }
            Err(fallback) => {
                counter!(ENRICHMENTS, "source" => "unavailable").increment(1);
                tracing::error!(
                    service = %self.remote.service,
                    remote = %remote,
                    fallback = %fallback,
                    "courier profiles unavailable"
                );
                Err(EnrichError::EnrichmentUnavailable { remote, fallback })
            }
        }
    }

    async fn fetch_remote(&self, ids: &[CourierId]) -> Result<Vec<CourierProfile>, RemoteFailure> {
        let client = self.clients.client(&self.remote.service).await;
        let response = client
            .post_json(&self.remote.join_path, &JoinRequest { data: ids })
            .await?;

        Ok(response.json::<Vec<CourierProfile>>()?)
    }

    /// Caches every profile under its own key. The writes run in the background
    /// and their failures are only logged.
    ///
    /// Only the first profile of a duplicated id is written, the same one the
    /// merge uses.
    fn write_through(&self, profiles: &[CourierProfile]) {
        let mut queued = HashSet::with_capacity(profiles.len());
        let mut entries = Vec::with_capacity(profiles.len());
        for profile in profiles {
            if !queued.insert(profile.id) {
                continue;
            }
            match serde_json::to_vec(profile) {
                Ok(value) => entries.push((cache_key(profile.id), Bytes::from(value))),
                Err(err) => {
                    tracing::warn!(courier_id = profile.id, error = %err, "could not encode profile")
                }
            }
        }

        if entries.is_empty() {
            return;
        }

        let cache = self.cache.clone();
        tokio::spawn(async move {
            for (key, value) in entries {
                if let Err(err) = cache.set_with_expiry(&key, PROFILE_TTL, value).await {
                    counter!(CACHE_WRITE_FAILED).increment(1);
                    tracing::warn!(key, error = %err, "could not cache courier profile");
                }
            }
        });
    }

    async fn read_cache(&self, ids: &[CourierId]) -> Result<Vec<CourierProfile>, FallbackFailure> {
        let keys: Vec<String> = ids.iter().map(|id| cache_key(*id)).collect();
        let values = self.cache.mget(&keys).await?;

        let mut profiles = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();

        // A store returning fewer values than keys misses the remaining ones
        let mut values = values.into_iter();
        for &id in ids {
            match values.next().flatten() {
                Some(bytes) => {
                    let profile: CourierProfile = serde_json::from_slice(&bytes)
                        .map_err(|source| FallbackFailure::CacheDecodeFailure { id, source })?;
                    if profile.id != id {
                        return Err(FallbackFailure::CacheEntryMismatch {
                            expected: id,
                            found: profile.id,
                        });
                    }
                    profiles.push(profile);
                }
                None => missing.push(id),
            }
        }

        counter!(CACHE_FALLBACK_HIT).increment(profiles.len() as u64);
        if !missing.is_empty() {
            counter!(CACHE_FALLBACK_MISS).increment(missing.len() as u64);
            return Err(FallbackFailure::CacheMiss { missing });
        }

        Ok(profiles)
    }
}
