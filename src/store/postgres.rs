//! 基于 PostGIS 的空间数据存储实现

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::debug;

use super::{InequalityRow, PopulationRow, SpatialStore};
use crate::config::DatabaseConfig;
use crate::error::OrchestratorResult;

/// 所有列统一转换为解码所需的类型，避免整型宽度不一致导致解码失败
const POPULATION_SQL: &str = r#"
WITH target AS (
  SELECT geom
  FROM census_blocks
  WHERE ST_Contains(geom, ST_SetSRID(ST_Point($1, $2), 4326))
  LIMIT 1
)
SELECT
  pobtot::bigint, pobmas::bigint, pobfem::bigint,
  pob0_14::bigint, pob15_29::bigint, pob30_59::bigint, p_60::bigint,
  p_cd_t::bigint, graproes::float8, graproes_f::float8, graproes_m::float8,
  vivtot::bigint, vivpar::bigint, tvipahab::bigint, vivnohab::bigint,
  prom_ocup::float8, pro_ocup_c::float8, v3masocu::bigint, v3masocu_p::float8,
  vph_pidt::bigint, vph_pidt_p::float8, vph_c_el::bigint, vph_c_el_p::float8,
  vph_exsa::bigint, vph_exsa_p::float8, vph_dren::bigint, vph_dren_p::float8,
  recucall_c::text, rampas_c::boolean, pasopeat_c::boolean, banqueta_c::boolean,
  guarnici_c::boolean, ciclovia_c::boolean, ciclocar_c::boolean, alumpub_c::boolean,
  letrero_c::boolean, telpub_c::boolean, arboles_c::boolean, drenajep_c::boolean,
  transcol_c::boolean, acesoper_c::boolean, acesoaut_c::boolean,
  puessemi_c::boolean, puesambu_c::boolean
FROM urban_features
WHERE ST_Intersects(geom, (SELECT geom FROM target))
LIMIT 1
"#;

const INEQUALITY_SQL: &str = r#"
SELECT
  cve_ent::bigint, cve_mun::bigint, cve_sun::text, cvegeo::text,
  sun::text, gmu::text, iisu_sun::text, iisu_cd::text,
  pobtot::bigint AS pobtot,
  empleo::bigint AS empleo,
  e_basica::bigint AS e_basica,
  e_media::bigint AS e_media,
  e_superior::bigint AS e_superior,
  salud_cama::bigint AS salud_cama,
  salud_cons::bigint AS salud_cons,
  abasto::bigint AS abasto,
  espacio_ab::bigint AS espacio_ab,
  cultura::bigint AS cultura,
  est_tpte::bigint AS est_tpte
FROM inequality_indicators
WHERE ST_Contains(geom, ST_SetSRID(ST_Point($1, $2), 4326))
LIMIT 1
"#;

/// PostGIS 存储，内部持有连接池
#[derive(Clone)]
pub struct PgSpatialStore {
    pool: PgPool,
}

impl PgSpatialStore {
    /// 创建惰性连接池，首次查询时才真正建立连接
    pub fn connect_lazy(config: &DatabaseConfig) -> OrchestratorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect_lazy(&config.url)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl SpatialStore for PgSpatialStore {
    async fn population_features(
        &self,
        lon: f64,
        lat: f64,
    ) -> OrchestratorResult<Option<PopulationRow>> {
        debug!(lon, lat, "querying population features");
        let row = sqlx::query_as::<_, PopulationRow>(POPULATION_SQL)
            .bind(lon)
            .bind(lat)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn inequality_indicators(
        &self,
        lon: f64,
        lat: f64,
    ) -> OrchestratorResult<Option<InequalityRow>> {
        debug!(lon, lat, "querying inequality indicators");
        let row = sqlx::query_as::<_, InequalityRow>(INEQUALITY_SQL)
            .bind(lon)
            .bind(lat)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
