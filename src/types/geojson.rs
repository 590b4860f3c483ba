//! GeoJSON 数据结构：几何体、要素与要素集合

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

/// 坐标点（经度在前，与 GeoJSON 保持一致）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.lon, self.lat].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // 允许携带高程等额外维度，只取前两位
        let coords = Vec::<f64>::deserialize(deserializer)?;
        if coords.len() < 2 {
            return Err(D::Error::invalid_length(
                coords.len(),
                &"a position with at least two coordinates",
            ));
        }
        Ok(Position::new(coords[0], coords[1]))
    }
}

/// 区域输入支持的几何类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// 转换为 GeoJSON 值
    pub fn to_value(&self) -> Value {
        fn ring(positions: &[Position]) -> Value {
            Value::Array(positions.iter().map(|p| json!([p.lon, p.lat])).collect())
        }
        fn polygon(rings: &[Vec<Position>]) -> Value {
            Value::Array(rings.iter().map(|r| ring(r)).collect())
        }

        let coordinates = match self {
            Geometry::Point(p) => json!([p.lon, p.lat]),
            Geometry::Polygon(rings) => polygon(rings),
            Geometry::MultiPolygon(polygons) => {
                Value::Array(polygons.iter().map(|p| polygon(p)).collect())
            }
        };
        json!({ "type": self.kind(), "coordinates": coordinates })
    }
}

/// 要素类型标记，固定为 `"Feature"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    #[default]
    Feature,
}

/// 地图要素
///
/// 几何体保持为原始 JSON，外部模型给出的要素可以原样追加；
/// `bbox` 等其他成员保存在 `foreign_members` 中，序列化时原样写回。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub foreign_members: Map<String, Value>,
}

const FEATURE_MEMBERS: [&str; 4] = ["type", "id", "geometry", "properties"];

impl Feature {
    pub fn new(geometry: &Geometry, properties: Map<String, Value>) -> Self {
        Self {
            kind: FeatureKind::Feature,
            id: None,
            geometry: geometry.to_value(),
            properties,
            foreign_members: Map::new(),
        }
    }

    /// 从任意 JSON 值中识别格式正确的 Feature
    ///
    /// 只接受 `type == "Feature"` 的对象；`properties` 为 null 时视为空。
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("type").and_then(Value::as_str) != Some("Feature") {
            return None;
        }
        let properties = match obj.get("properties") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return None,
        };
        let foreign_members = obj
            .iter()
            .filter(|(key, _)| !FEATURE_MEMBERS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Some(Self {
            kind: FeatureKind::Feature,
            id: obj.get("id").cloned(),
            geometry: obj.get("geometry").cloned().unwrap_or(Value::Null),
            properties,
            foreign_members,
        })
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// 输出文档：有序、只追加的要素集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// 判断 `self` 是否以 `earlier` 为前缀（只追加、不重排）
    pub fn extends(&self, earlier: &FeatureCollection) -> bool {
        self.features.len() >= earlier.features.len()
            && self.features[..earlier.features.len()] == earlier.features[..]
    }
}
