//! Site registry repository.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{DieselError, SqlitePool};
use super::records::{NewSite, SiteRecord};
use crate::models::{normalize_domain, Site};
use crate::schema::drupal_site;

/// Repository for the `drupal_site` table.
#[derive(Clone)]
pub struct SiteRepository {
    pool: SqlitePool,
}

impl SiteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a site, or update its metadata when the domain is already registered.
    ///
    /// Domains are stored lowercased without a leading `www.`.
    pub async fn upsert(
        &self,
        domain: &str,
        security_group_name: Option<&str>,
        box_folder: Option<&str>,
    ) -> Result<Site, DieselError> {
        let mut conn = self.pool.get().await?;
        let lowered = domain.trim().to_ascii_lowercase();
        let domain_name = lowered.strip_prefix("www.").unwrap_or(&lowered);

        diesel::insert_into(drupal_site::table)
            .values(&NewSite {
                domain_name,
                security_group_name,
                box_folder,
            })
            .on_conflict(drupal_site::domain_name)
            .do_update()
            .set((
                drupal_site::security_group_name.eq(security_group_name),
                drupal_site::box_folder.eq(box_folder),
            ))
            .execute(&mut conn)
            .await?;

        drupal_site::table
            .filter(drupal_site::domain_name.eq(domain_name))
            .select(SiteRecord::as_select())
            .first(&mut conn)
            .await
            .map(Site::from)
    }

    /// Get all sites ordered by domain.
    pub async fn get_all(&self) -> Result<Vec<Site>, DieselError> {
        let mut conn = self.pool.get().await?;
        drupal_site::table
            .order(drupal_site::domain_name.asc())
            .select(SiteRecord::as_select())
            .load(&mut conn)
            .await
            .map(|records| records.into_iter().map(Site::from).collect())
    }

    /// Find a site by domain, folder name, or any case/`www.` variant of either.
    pub async fn get_by_domain(&self, domain: &str) -> Result<Option<Site>, DieselError> {
        let wanted = normalize_domain(domain);
        let sites = self.get_all().await?;
        Ok(sites
            .into_iter()
            .find(|site| normalize_domain(&site.domain_name) == wanted))
    }

    /// Resolve a domain or crawl folder name to a site id.
    pub async fn site_id_for_domain(&self, domain: &str) -> Result<Option<i32>, DieselError> {
        Ok(self.get_by_domain(domain).await?.map(|site| site.id))
    }
}
