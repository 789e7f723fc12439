//! 灯光组件
//!
//! 场景中的灯光节点只参与变换传播和点图元绘制，不做光照计算。

/// 光源颜色（RGB）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// 白色
    pub const fn white() -> Self {
        Self { r: 1.0, g: 1.0, b: 1.0 }
    }

    /// 转换为数组
    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// 实例颜色（RGBA，alpha = 1）
    pub fn to_rgba(&self) -> [f32; 4] {
        [self.r, self.g, self.b, 1.0]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::white()
    }
}

impl From<[f32; 3]> for Color {
    fn from(rgb: [f32; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

/// 光源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// 方向光
    Directional,
    /// 点光源
    Point,
    /// 聚光灯
    Spot,
}

impl LightType {
    /// 从场景文件中的名称解析
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "directional" => Some(LightType::Directional),
            "point" => Some(LightType::Point),
            "spot" => Some(LightType::Spot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub color: Color,
    pub intensity: f32,
}

impl Light {
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            color: Color::white(),
            intensity: 1.0,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }
}
