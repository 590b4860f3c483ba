use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::geojson::Geometry;
use crate::utils::geometry::centroid;

/// 调用方提交的单个区域
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneInput {
    /// 区域唯一标识
    pub id: String,
    /// 原始 GeoJSON 几何（Point / Polygon / MultiPolygon）
    pub geometry: Geometry,
    /// 附加属性
    #[serde(default)]
    pub data: Map<String, Value>,
    /// 显式指定的质心纬度，缺省时由几何体计算
    #[serde(default)]
    pub lat: Option<f64>,
    /// 显式指定的质心经度，缺省时由几何体计算
    #[serde(default)]
    pub lon: Option<f64>,
}

/// 运行期间不可变的区域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub geometry: Geometry,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ZoneInput {
    /// 补全质心并校验坐标
    pub fn prepare(self) -> OrchestratorResult<Zone> {
        if self.id.trim().is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "zone id must not be empty".to_string(),
            ));
        }

        let (lat, lon) = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => {
                let c = centroid(&self.geometry).ok_or_else(|| {
                    OrchestratorError::InvalidInput(format!(
                        "zone `{}` has an empty geometry and no centroid",
                        self.id
                    ))
                })?;
                (c.lat, c.lon)
            }
        };

        if !lat.is_finite() || !lon.is_finite() {
            return Err(OrchestratorError::InvalidInput(format!(
                "zone `{}` has a non-finite centroid",
                self.id
            )));
        }

        Ok(Zone {
            id: self.id,
            lat,
            lon,
            geometry: self.geometry,
            data: self.data,
        })
    }
}

/// 一次规划请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    /// 待分析的区域列表
    pub zones: Vec<ZoneInput>,
    /// 分析过滤条件
    #[serde(default)]
    pub filters: Map<String, Value>,
    /// 规划目标（如“改善出行”）
    #[serde(default)]
    pub objectives: Vec<String>,
}

impl PlanRequest {
    /// 准备全部区域；任何结构性问题都直接返回错误，不进入编排
    pub fn prepare_zones(&self) -> OrchestratorResult<Vec<Zone>> {
        let mut seen = HashSet::new();
        let mut zones = Vec::with_capacity(self.zones.len());
        for input in &self.zones {
            if !seen.insert(input.id.clone()) {
                return Err(OrchestratorError::InvalidInput(format!(
                    "duplicate zone id `{}`",
                    input.id
                )));
            }
            zones.push(input.clone().prepare()?);
        }
        Ok(zones)
    }
}
