//! 空间数据存储：按点落面（point-in-polygon）查询区域上下文
//!
//! 每次查询返回 0 或 1 行，所有字段均可缺失，由上层负责填充默认值。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorResult;

pub mod postgres;

pub use postgres::PgSpatialStore;

/// 人口与城市基础设施特征（普查街区）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PopulationRow {
    pub pobtot: Option<i64>,
    pub pobmas: Option<i64>,
    pub pobfem: Option<i64>,
    pub pob0_14: Option<i64>,
    pub pob15_29: Option<i64>,
    pub pob30_59: Option<i64>,
    pub p_60: Option<i64>,
    pub p_cd_t: Option<i64>,
    pub graproes: Option<f64>,
    pub graproes_f: Option<f64>,
    pub graproes_m: Option<f64>,

    pub vivtot: Option<i64>,
    pub vivpar: Option<i64>,
    pub tvipahab: Option<i64>,
    pub vivnohab: Option<i64>,
    pub prom_ocup: Option<f64>,
    pub pro_ocup_c: Option<f64>,
    pub v3masocu: Option<i64>,
    pub v3masocu_p: Option<f64>,

    pub vph_pidt: Option<i64>,
    pub vph_pidt_p: Option<f64>,
    pub vph_c_el: Option<i64>,
    pub vph_c_el_p: Option<f64>,
    pub vph_exsa: Option<i64>,
    pub vph_exsa_p: Option<f64>,
    pub vph_dren: Option<i64>,
    pub vph_dren_p: Option<f64>,

    pub recucall_c: Option<String>,
    pub rampas_c: Option<bool>,
    pub pasopeat_c: Option<bool>,
    pub banqueta_c: Option<bool>,
    pub guarnici_c: Option<bool>,
    pub ciclovia_c: Option<bool>,
    pub ciclocar_c: Option<bool>,
    pub alumpub_c: Option<bool>,
    pub letrero_c: Option<bool>,
    pub telpub_c: Option<bool>,
    pub arboles_c: Option<bool>,
    pub drenajep_c: Option<bool>,
    pub transcol_c: Option<bool>,
    pub acesoper_c: Option<bool>,
    pub acesoaut_c: Option<bool>,
    pub puessemi_c: Option<bool>,
    pub puesambu_c: Option<bool>,
}

/// 城市不平等指标（城市系统单元）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InequalityRow {
    pub cve_ent: Option<i64>,
    pub cve_mun: Option<i64>,
    pub cve_sun: Option<String>,
    pub cvegeo: Option<String>,
    pub sun: Option<String>,
    pub gmu: Option<String>,
    pub iisu_sun: Option<String>,
    pub iisu_cd: Option<String>,

    pub pobtot: Option<i64>,
    pub empleo: Option<i64>,
    pub e_basica: Option<i64>,
    pub e_media: Option<i64>,
    pub e_superior: Option<i64>,
    pub salud_cama: Option<i64>,
    pub salud_cons: Option<i64>,
    pub abasto: Option<i64>,
    pub espacio_ab: Option<i64>,
    pub cultura: Option<i64>,
    pub est_tpte: Option<i64>,
}

/// 空间数据存储接口
#[async_trait]
pub trait SpatialStore: Send + Sync {
    /// 查询包含 (lon, lat) 的普查街区所对应的城市特征
    async fn population_features(
        &self,
        lon: f64,
        lat: f64,
    ) -> OrchestratorResult<Option<PopulationRow>>;

    /// 查询包含 (lon, lat) 的不平等指标
    async fn inequality_indicators(
        &self,
        lon: f64,
        lat: f64,
    ) -> OrchestratorResult<Option<InequalityRow>>;
}
