use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::{EngineResult, Rendition, RuleSet};

/// One independently selectable presentation dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeAxis {
    PageColor,
    LineHeight,
    FontSize,
    FontFamily,
}

impl ThemeAxis {
    pub fn prefix(self) -> &'static str {
        match self {
            ThemeAxis::PageColor => "page",
            ThemeAxis::LineHeight => "line",
            ThemeAxis::FontSize => "fontsize",
            ThemeAxis::FontFamily => "font",
        }
    }
}

/// One named catalog entry: a compiled presentation rule registered with the
/// engine under `{axis prefix}_{name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeValue {
    axis: ThemeAxis,
    name: String,
    registered: String,
    rule: RuleSet,
}

impl ThemeValue {
    fn new(axis: ThemeAxis, name: &str, rule: RuleSet) -> Self {
        Self {
            axis,
            name: name.to_owned(),
            registered: format!("{}_{}", axis.prefix(), name),
            rule,
        }
    }

    pub fn axis(&self) -> ThemeAxis {
        self.axis
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Globally unique name the rule is registered and selected under.
    pub fn registered_name(&self) -> &str {
        &self.registered
    }

    pub fn rule(&self) -> &RuleSet {
        &self.rule
    }
}

pub static PAGE_COLORS: Lazy<Vec<ThemeValue>> = Lazy::new(|| {
    let page = |name: &str, background: &str, color: &str| {
        ThemeValue::new(
            ThemeAxis::PageColor,
            name,
            RuleSet::new()
                .declare("body", "background", background)
                .declare("body", "color", color),
        )
    };
    vec![
        page("basic", "#ffffff", "#000000"),
        page("pale", "#f5ecd9", "#5b4636"),
        page("dark", "#121212", "#c8c8c8"),
        page("lightdark", "#3a3a3a", "#e8e8e8"),
    ]
});

pub static LINE_HEIGHTS: Lazy<Vec<ThemeValue>> = Lazy::new(|| {
    (1u8..=6)
        .map(|step| {
            let height = 1.0 + 0.2 * f32::from(step - 1);
            ThemeValue::new(
                ThemeAxis::LineHeight,
                &step.to_string(),
                RuleSet::new().declare("body", "line-height", &format!("{height:.1}")),
            )
        })
        .collect()
});

pub static FONT_SIZES: Lazy<Vec<ThemeValue>> = Lazy::new(|| {
    let size = |name: &str, value: &str| {
        ThemeValue::new(
            ThemeAxis::FontSize,
            name,
            RuleSet::new().declare("body", "font-size", value),
        )
    };
    vec![
        size("~", "inherit"),
        size("17", "17px"),
        size("22", "22px"),
        size("25", "25px"),
        size("29", "29px"),
    ]
});

pub static FONT_FAMILIES: Lazy<Vec<ThemeValue>> = Lazy::new(|| {
    let font = |name: &str, family: &str| {
        ThemeValue::new(
            ThemeAxis::FontFamily,
            name,
            RuleSet::new().declare("body", "font-family", family),
        )
    };
    vec![
        font("Arial", "Arial, Helvetica, sans-serif"),
        font("Serif", "'Times New Roman', serif"),
        font("Roboto", "Roboto, sans-serif"),
        font("Monospace", "'Courier New', monospace"),
        font("Verdana", "Verdana, sans-serif"),
        font("Georgia", "Georgia, serif"),
    ]
});

pub fn axis_values(axis: ThemeAxis) -> &'static [ThemeValue] {
    match axis {
        ThemeAxis::PageColor => &PAGE_COLORS,
        ThemeAxis::LineHeight => &LINE_HEIGHTS,
        ThemeAxis::FontSize => &FONT_SIZES,
        ThemeAxis::FontFamily => &FONT_FAMILIES,
    }
}

pub fn all_values() -> impl Iterator<Item = &'static ThemeValue> {
    PAGE_COLORS
        .iter()
        .chain(LINE_HEIGHTS.iter())
        .chain(FONT_SIZES.iter())
        .chain(FONT_FAMILIES.iter())
}

/// Looks a catalog entry up by its registered name.
pub fn find(registered: &str) -> Option<&'static ThemeValue> {
    all_values().find(|value| value.registered_name() == registered)
}

fn default_value(axis: ThemeAxis) -> &'static ThemeValue {
    &axis_values(axis)[0]
}

/// Registers every catalog entry with the rendition. Awaited to completion
/// before any rule is selected: selecting an unregistered rule is a silent
/// no-op in the engine, so registration forms a barrier ahead of the first
/// snapshot apply. Safe to repeat when a document is reloaded.
pub async fn register_all(rendition: &dyn Rendition) -> EngineResult<()> {
    for value in all_values() {
        rendition
            .register_presentation_rule(value.registered_name(), value.rule())
            .await?;
    }
    Ok(())
}

/// The selected value of every axis. All four fields are always set; a fresh
/// snapshot selects the first catalog entry of each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeSnapshot {
    pub page: &'static ThemeValue,
    pub line: &'static ThemeValue,
    pub font_size: &'static ThemeValue,
    pub font: &'static ThemeValue,
}

impl Default for ThemeSnapshot {
    fn default() -> Self {
        Self {
            page: default_value(ThemeAxis::PageColor),
            line: default_value(ThemeAxis::LineHeight),
            font_size: default_value(ThemeAxis::FontSize),
            font: default_value(ThemeAxis::FontFamily),
        }
    }
}

impl ThemeSnapshot {
    pub fn get(&self, axis: ThemeAxis) -> &'static ThemeValue {
        match axis {
            ThemeAxis::PageColor => self.page,
            ThemeAxis::LineHeight => self.line,
            ThemeAxis::FontSize => self.font_size,
            ThemeAxis::FontFamily => self.font,
        }
    }

    pub fn set(&mut self, value: &'static ThemeValue) {
        match value.axis() {
            ThemeAxis::PageColor => self.page = value,
            ThemeAxis::LineHeight => self.line = value,
            ThemeAxis::FontSize => self.font_size = value,
            ThemeAxis::FontFamily => self.font = value,
        }
    }

    /// Selects all four rules on the rendition. Page color and line height go
    /// first; font size and family last, so rules sharing the `body` selector
    /// cannot override them under the engine's cascade.
    pub fn apply(&self, rendition: &dyn Rendition) {
        for value in [self.page, self.line, self.font_size, self.font] {
            rendition.select_presentation_rule(value.registered_name());
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} {} {}",
            self.page.registered_name(),
            self.line.registered_name(),
            self.font_size.registered_name(),
            self.font.registered_name()
        )
    }
}

#[derive(Serialize, Deserialize)]
struct SnapshotRepr {
    page: String,
    line: String,
    font_size: String,
    font: String,
}

impl Serialize for ThemeSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SnapshotRepr {
            page: self.page.registered_name().to_owned(),
            line: self.line.registered_name().to_owned(),
            font_size: self.font_size.registered_name().to_owned(),
            font: self.font.registered_name().to_owned(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ThemeSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = SnapshotRepr::deserialize(deserializer)?;
        let resolve = |registered: &str| {
            find(registered).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown presentation rule {registered:?}"))
            })
        };
        Ok(Self {
            page: resolve(&repr.page)?,
            line: resolve(&repr.line)?,
            font_size: resolve(&repr.font_size)?,
            font: resolve(&repr.font)?,
        })
    }
}
