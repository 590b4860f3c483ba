//! 几何工具：米与经纬度换算、点生成正方形、质心与 WKT

use crate::types::geojson::{Geometry, Position};

/// 每纬度对应的米数（近似值）
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// 将距离（米）换算为 (纬度差, 经度差)
///
/// 经度方向按纬度余弦缩放，余弦下限 0.1 防止在极区发散。
pub fn meters_to_deg(lat: f64, meters: f64) -> (f64, f64) {
    let deg_lat = meters / METERS_PER_DEGREE;
    let deg_lon = meters / (METERS_PER_DEGREE * lat.to_radians().cos().abs().max(0.1));
    (deg_lat, deg_lon)
}

/// 以给定点为中心生成正方形多边形，`size_m` 为半边长
///
/// 结果为闭合的 5 点环（首尾坐标相同）。
pub fn square_from_point(lat: f64, lon: f64, size_m: f64) -> Geometry {
    let (dlat, dlon) = meters_to_deg(lat, size_m);
    let ring = vec![
        Position::new(lon - dlon, lat - dlat),
        Position::new(lon + dlon, lat - dlat),
        Position::new(lon + dlon, lat + dlat),
        Position::new(lon - dlon, lat + dlat),
        Position::new(lon - dlon, lat - dlat),
    ];
    Geometry::Polygon(vec![ring])
}

/// 计算几何体质心
///
/// 多边形按面积加权（内环扣除）；面积退化为 0 时退回到顶点平均值。
pub fn centroid(geometry: &Geometry) -> Option<Position> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        Geometry::Polygon(rings) => weighted_centroid(std::slice::from_ref(rings)),
        Geometry::MultiPolygon(polygons) => weighted_centroid(polygons),
    }
}

/// 环的面积矩：(面积, x 一阶矩, y 一阶矩)，面积取正
fn ring_moments(ring: &[Position]) -> (f64, f64, f64) {
    let mut area = 0.0;
    let mut mx = 0.0;
    let mut my = 0.0;
    for pair in ring.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let cross = a.lon * b.lat - b.lon * a.lat;
        area += cross;
        mx += (a.lon + b.lon) * cross;
        my += (a.lat + b.lat) * cross;
    }
    let area = area / 2.0;
    let (mx, my) = (mx / 6.0, my / 6.0);
    if area < 0.0 {
        (-area, -mx, -my)
    } else {
        (area, mx, my)
    }
}

fn weighted_centroid(polygons: &[Vec<Vec<Position>>]) -> Option<Position> {
    let mut total_area = 0.0;
    let mut total_mx = 0.0;
    let mut total_my = 0.0;

    for rings in polygons {
        for (index, ring) in rings.iter().enumerate() {
            let (area, mx, my) = ring_moments(ring);
            // 第一个环为外环，其余为洞
            let sign = if index == 0 { 1.0 } else { -1.0 };
            total_area += sign * area;
            total_mx += sign * mx;
            total_my += sign * my;
        }
    }

    if total_area.abs() > f64::EPSILON {
        return Some(Position::new(total_mx / total_area, total_my / total_area));
    }

    let vertices: Vec<&Position> = polygons.iter().flatten().flatten().collect();
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let lon = vertices.iter().map(|p| p.lon).sum::<f64>() / n;
    let lat = vertices.iter().map(|p| p.lat).sum::<f64>() / n;
    Some(Position::new(lon, lat))
}

/// 渲染为 WKT 文本
pub fn to_wkt(geometry: &Geometry) -> String {
    fn ring(positions: &[Position]) -> String {
        let coords: Vec<String> = positions
            .iter()
            .map(|p| format!("{} {}", p.lon, p.lat))
            .collect();
        format!("({})", coords.join(", "))
    }
    fn polygon(rings: &[Vec<Position>]) -> String {
        let rings: Vec<String> = rings.iter().map(|r| ring(r)).collect();
        format!("({})", rings.join(", "))
    }

    match geometry {
        Geometry::Point(p) => format!("POINT ({} {})", p.lon, p.lat),
        Geometry::Polygon(rings) if rings.is_empty() => "POLYGON EMPTY".to_string(),
        Geometry::Polygon(rings) => format!("POLYGON {}", polygon(rings)),
        Geometry::MultiPolygon(polygons) if polygons.is_empty() => {
            "MULTIPOLYGON EMPTY".to_string()
        }
        Geometry::MultiPolygon(polygons) => {
            let parts: Vec<String> = polygons.iter().map(|p| polygon(p)).collect();
            format!("MULTIPOLYGON ({})", parts.join(", "))
        }
    }
}
