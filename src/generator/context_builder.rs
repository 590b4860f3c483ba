//! 区域上下文载荷构建
//!
//! 为每个区域组装两个固定结构的请求：人口/基础设施特征（城市基础设施模型）
//! 与不平等指标（人口不平等模型）。数据库查询失败或无匹配行时，
//! 所有字段回退为默认值，不向上抛错。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{InequalityRow, PopulationRow, SpatialStore};
use crate::types::geojson::Geometry;
use crate::types::zone::Zone;
use crate::utils::geometry::{centroid, to_wkt};

/// 城市基础设施模型的请求载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationPayload {
    pub pobtot: i64,
    pub pobmas: i64,
    pub pobfem: i64,
    pub pob0_14: i64,
    pub pob15_29: i64,
    pub pob30_59: i64,
    pub p_60: i64,
    pub p_cd_t: i64,
    pub graproes: f64,
    pub graproes_f: f64,
    pub graproes_m: f64,

    pub vivtot: i64,
    pub vivpar: i64,
    pub tvipahab: i64,
    pub vivnohab: i64,
    pub prom_ocup: f64,
    pub pro_ocup_c: f64,
    pub v3masocu: i64,
    pub v3masocu_p: f64,

    pub vph_pidt: i64,
    pub vph_pidt_p: f64,
    pub vph_c_el: i64,
    pub vph_c_el_p: f64,
    pub vph_exsa: i64,
    pub vph_exsa_p: f64,
    pub vph_dren: i64,
    pub vph_dren_p: f64,

    pub recucall_c: String,
    pub rampas_c: bool,
    pub pasopeat_c: bool,
    pub banqueta_c: bool,
    pub guarnici_c: bool,
    pub ciclovia_c: bool,
    pub ciclocar_c: bool,
    pub alumpub_c: bool,
    pub letrero_c: bool,
    pub telpub_c: bool,
    pub arboles_c: bool,
    pub drenajep_c: bool,
    pub transcol_c: bool,
    pub acesoper_c: bool,
    pub acesoaut_c: bool,
    pub puessemi_c: bool,
    pub puesambu_c: bool,

    pub lat: f64,
    pub lon: f64,
}

impl PopulationPayload {
    /// 缺失字段：计数为 0，比例为 0.0，道路铺装为 "paved"，街道设施为 false
    pub fn from_row(row: Option<PopulationRow>, lat: f64, lon: f64) -> Self {
        let row = row.unwrap_or_default();
        Self {
            pobtot: row.pobtot.unwrap_or(0),
            pobmas: row.pobmas.unwrap_or(0),
            pobfem: row.pobfem.unwrap_or(0),
            pob0_14: row.pob0_14.unwrap_or(0),
            pob15_29: row.pob15_29.unwrap_or(0),
            pob30_59: row.pob30_59.unwrap_or(0),
            p_60: row.p_60.unwrap_or(0),
            p_cd_t: row.p_cd_t.unwrap_or(0),
            graproes: row.graproes.unwrap_or(0.0),
            graproes_f: row.graproes_f.unwrap_or(0.0),
            graproes_m: row.graproes_m.unwrap_or(0.0),

            vivtot: row.vivtot.unwrap_or(0),
            vivpar: row.vivpar.unwrap_or(0),
            tvipahab: row.tvipahab.unwrap_or(0),
            vivnohab: row.vivnohab.unwrap_or(0),
            prom_ocup: row.prom_ocup.unwrap_or(0.0),
            pro_ocup_c: row.pro_ocup_c.unwrap_or(0.0),
            v3masocu: row.v3masocu.unwrap_or(0),
            v3masocu_p: row.v3masocu_p.unwrap_or(0.0),

            vph_pidt: row.vph_pidt.unwrap_or(0),
            vph_pidt_p: row.vph_pidt_p.unwrap_or(0.0),
            vph_c_el: row.vph_c_el.unwrap_or(0),
            vph_c_el_p: row.vph_c_el_p.unwrap_or(0.0),
            vph_exsa: row.vph_exsa.unwrap_or(0),
            vph_exsa_p: row.vph_exsa_p.unwrap_or(0.0),
            vph_dren: row.vph_dren.unwrap_or(0),
            vph_dren_p: row.vph_dren_p.unwrap_or(0.0),

            recucall_c: row.recucall_c.unwrap_or_else(|| "paved".to_string()),
            rampas_c: row.rampas_c.unwrap_or(false),
            pasopeat_c: row.pasopeat_c.unwrap_or(false),
            banqueta_c: row.banqueta_c.unwrap_or(false),
            guarnici_c: row.guarnici_c.unwrap_or(false),
            ciclovia_c: row.ciclovia_c.unwrap_or(false),
            ciclocar_c: row.ciclocar_c.unwrap_or(false),
            alumpub_c: row.alumpub_c.unwrap_or(false),
            letrero_c: row.letrero_c.unwrap_or(false),
            telpub_c: row.telpub_c.unwrap_or(false),
            arboles_c: row.arboles_c.unwrap_or(false),
            drenajep_c: row.drenajep_c.unwrap_or(false),
            transcol_c: row.transcol_c.unwrap_or(false),
            acesoper_c: row.acesoper_c.unwrap_or(false),
            acesoaut_c: row.acesoaut_c.unwrap_or(false),
            puessemi_c: row.puessemi_c.unwrap_or(false),
            puesambu_c: row.puesambu_c.unwrap_or(false),

            lat,
            lon,
        }
    }
}

/// 人口不平等模型的请求载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InequalityPayload {
    pub cve_ent: i64,
    pub cve_mun: i64,
    pub cve_sun: String,
    pub cvegeo: String,
    pub sun: String,
    pub gmu: String,
    pub iisu_sun: String,
    pub iisu_cd: String,

    #[serde(rename = "POBTOT")]
    pub pobtot: i64,
    #[serde(rename = "Empleo")]
    pub empleo: i64,
    #[serde(rename = "E_basica")]
    pub e_basica: i64,
    #[serde(rename = "E_media")]
    pub e_media: i64,
    #[serde(rename = "E_superior")]
    pub e_superior: i64,
    #[serde(rename = "Salud_cama")]
    pub salud_cama: i64,
    #[serde(rename = "Salud_cons")]
    pub salud_cons: i64,
    #[serde(rename = "Abasto")]
    pub abasto: i64,
    #[serde(rename = "Espacio_ab")]
    pub espacio_ab: i64,
    #[serde(rename = "Cultura")]
    pub cultura: i64,
    #[serde(rename = "Est_Tpte")]
    pub est_tpte: i64,

    pub geometry_wkt: String,
    pub lat: f64,
    pub lon: f64,
}

impl InequalityPayload {
    pub fn from_row(row: Option<InequalityRow>, geometry_wkt: String, lat: f64, lon: f64) -> Self {
        let row = row.unwrap_or_default();
        Self {
            cve_ent: row.cve_ent.unwrap_or(0),
            cve_mun: row.cve_mun.unwrap_or(0),
            cve_sun: row.cve_sun.unwrap_or_default(),
            cvegeo: row.cvegeo.unwrap_or_default(),
            sun: row.sun.unwrap_or_default(),
            gmu: row.gmu.unwrap_or_default(),
            iisu_sun: row.iisu_sun.unwrap_or_default(),
            iisu_cd: row.iisu_cd.unwrap_or_default(),

            pobtot: row.pobtot.unwrap_or(0),
            empleo: row.empleo.unwrap_or(0),
            e_basica: row.e_basica.unwrap_or(0),
            e_media: row.e_media.unwrap_or(0),
            e_superior: row.e_superior.unwrap_or(0),
            salud_cama: row.salud_cama.unwrap_or(0),
            salud_cons: row.salud_cons.unwrap_or(0),
            abasto: row.abasto.unwrap_or(0),
            espacio_ab: row.espacio_ab.unwrap_or(0),
            cultura: row.cultura.unwrap_or(0),
            est_tpte: row.est_tpte.unwrap_or(0),

            geometry_wkt,
            lat,
            lon,
        }
    }
}

/// 单个区域的两份请求载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneContext {
    pub population: PopulationPayload,
    pub inequality: InequalityPayload,
}

/// 上下文载荷构建器
#[derive(Clone)]
pub struct ContextPayloadBuilder {
    store: Arc<dyn SpatialStore>,
}

impl ContextPayloadBuilder {
    pub fn new(store: Arc<dyn SpatialStore>) -> Self {
        Self { store }
    }

    /// 查询点：几何体质心，几何体为空时退回区域坐标
    fn query_point(geometry: &Geometry, lat: f64, lon: f64) -> (f64, f64) {
        centroid(geometry)
            .map(|c| (c.lon, c.lat))
            .unwrap_or((lon, lat))
    }

    pub async fn build_population_payload(
        &self,
        geometry: &Geometry,
        lat: f64,
        lon: f64,
    ) -> PopulationPayload {
        let (qlon, qlat) = Self::query_point(geometry, lat, lon);
        let row = match self.store.population_features(qlon, qlat).await {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, lon = qlon, lat = qlat, "population lookup failed, using defaults");
                None
            }
        };
        PopulationPayload::from_row(row, lat, lon)
    }

    pub async fn build_inequality_payload(
        &self,
        geometry: &Geometry,
        lat: f64,
        lon: f64,
    ) -> InequalityPayload {
        let (qlon, qlat) = Self::query_point(geometry, lat, lon);
        let row = match self.store.inequality_indicators(qlon, qlat).await {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, lon = qlon, lat = qlat, "inequality lookup failed, using defaults");
                None
            }
        };
        InequalityPayload::from_row(row, to_wkt(geometry), lat, lon)
    }

    /// 为区域构建两份载荷
    pub async fn build(&self, zone: &Zone) -> ZoneContext {
        let population = self
            .build_population_payload(&zone.geometry, zone.lat, zone.lon)
            .await;
        let inequality = self
            .build_inequality_payload(&zone.geometry, zone.lat, zone.lon)
            .await;
        debug!(zone = %zone.id, "zone context built");
        ZoneContext {
            population,
            inequality,
        }
    }
}
