//! The label draft: form fields as the editor holds them.
//!
//! Values are kept as strings, exactly as form inputs hold them. Numeric
//! fields are only interpreted when a JSON body needs real numbers.

use crate::ProtocolVersion;
use serde_json::{Map, Value};

/// A recognized label form control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    BeerName,
    /// Second text line. Sent as `brewer_name` by v1 forms.
    Subtitle,
    Abv,
    BeerSize,
    BorderColor,
    TextColor,
    Font,
    FontSize,
    ImageX,
    ImageY,
    CropX,
    /// v2 only
    CropY,
    /// v1 only
    ImageRotation,
}

/// When a field change should re-post the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTrigger {
    /// Fires on every input and on change
    Continuous,
    /// Fires on change (control released) only
    ReleaseOnly,
}

/// The two events a form control emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    /// Value is being edited (keystroke, slider drag)
    Input,
    /// Value was committed (blur, slider release)
    Change,
}

/// Which half of a slider/number pair the user touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    Range,
    Number,
}

impl FieldTrigger {
    pub fn fires_on(self, event: FieldEvent) -> bool {
        match self {
            FieldTrigger::Continuous => true,
            FieldTrigger::ReleaseOnly => event == FieldEvent::Change,
        }
    }

    /// The single event that represents one committed user edit
    pub fn edit_event(self) -> FieldEvent {
        match self {
            FieldTrigger::Continuous => FieldEvent::Input,
            FieldTrigger::ReleaseOnly => FieldEvent::Change,
        }
    }
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::BeerName,
        Field::Subtitle,
        Field::Abv,
        Field::BeerSize,
        Field::BorderColor,
        Field::TextColor,
        Field::Font,
        Field::FontSize,
        Field::ImageX,
        Field::ImageY,
        Field::CropX,
        Field::CropY,
        Field::ImageRotation,
    ];

    /// Form/wire name of the field under the given protocol
    pub fn name(self, protocol: ProtocolVersion) -> &'static str {
        match self {
            Field::BeerName => "beer_name",
            Field::Subtitle => match protocol {
                ProtocolVersion::V1 => "brewer_name",
                ProtocolVersion::V2 => "subtitle",
            },
            Field::Abv => "abv",
            Field::BeerSize => "beer_size",
            Field::BorderColor => "border_color",
            Field::TextColor => "text_color",
            Field::Font => "font",
            Field::FontSize => "font_size",
            Field::ImageX => "image_x",
            Field::ImageY => "image_y",
            Field::CropX => "crop_x",
            Field::CropY => "crop_y",
            Field::ImageRotation => "image_rotation",
        }
    }

    /// Look a field up by wire name. Both subtitle spellings are accepted.
    pub fn from_name(name: &str) -> Option<Field> {
        let field = match name.trim() {
            "beer_name" => Field::BeerName,
            "subtitle" | "brewer_name" => Field::Subtitle,
            "abv" => Field::Abv,
            "beer_size" => Field::BeerSize,
            "border_color" => Field::BorderColor,
            "text_color" => Field::TextColor,
            "font" => Field::Font,
            "font_size" => Field::FontSize,
            "image_x" => Field::ImageX,
            "image_y" => Field::ImageY,
            "crop_x" => Field::CropX,
            "crop_y" => Field::CropY,
            "image_rotation" => Field::ImageRotation,
            _ => return None,
        };
        Some(field)
    }

    pub fn is_available(self, protocol: ProtocolVersion) -> bool {
        match self {
            Field::CropY => protocol == ProtocolVersion::V2,
            Field::ImageRotation => protocol == ProtocolVersion::V1,
            _ => true,
        }
    }

    /// Fields present on the form for `protocol`, in form order
    pub fn for_protocol(protocol: ProtocolVersion) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| f.is_available(protocol))
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::FontSize
                | Field::ImageX
                | Field::ImageY
                | Field::CropX
                | Field::CropY
                | Field::ImageRotation
        )
    }

    /// Percentage sliders that show their value in a `<name>_value` label
    pub fn is_percentage_range(self) -> bool {
        matches!(self, Field::ImageX | Field::ImageY | Field::CropX | Field::CropY)
    }

    pub fn is_color(self) -> bool {
        matches!(self, Field::BorderColor | Field::TextColor)
    }

    pub fn trigger(self, protocol: ProtocolVersion) -> FieldTrigger {
        match (protocol, self) {
            (ProtocolVersion::V2, Field::CropX | Field::CropY) => FieldTrigger::ReleaseOnly,
            _ => FieldTrigger::Continuous,
        }
    }

    /// Element id of one half of a slider/number pair
    pub fn pair_element(self, side: PairSide, protocol: ProtocolVersion) -> String {
        match side {
            PairSide::Range => format!("{}_range", self.name(protocol)),
            PairSide::Number => self.name(protocol).to_string(),
        }
    }
}

/// A text value shown next to a control, derived from the control's value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedDisplay {
    pub element_id: String,
    pub text: String,
}

/// The in-memory label draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDraft {
    pub beer_name: String,
    pub subtitle: String,
    pub abv: String,
    pub beer_size: String,
    pub border_color: String,
    pub text_color: String,
    pub font: String,
    pub font_size: String,
    pub image_x: String,
    pub image_y: String,
    pub crop_x: String,
    pub crop_y: String,
    pub image_rotation: String,
}

impl Default for LabelDraft {
    fn default() -> Self {
        Self {
            beer_name: String::new(),
            subtitle: String::new(),
            abv: String::new(),
            beer_size: String::new(),
            border_color: "#000000".to_string(),
            text_color: "#000000".to_string(),
            font: "Arial".to_string(),
            font_size: "24".to_string(),
            image_x: "50".to_string(),
            image_y: "50".to_string(),
            crop_x: "50".to_string(),
            crop_y: "50".to_string(),
            image_rotation: "0".to_string(),
        }
    }
}

impl LabelDraft {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::BeerName => &self.beer_name,
            Field::Subtitle => &self.subtitle,
            Field::Abv => &self.abv,
            Field::BeerSize => &self.beer_size,
            Field::BorderColor => &self.border_color,
            Field::TextColor => &self.text_color,
            Field::Font => &self.font,
            Field::FontSize => &self.font_size,
            Field::ImageX => &self.image_x,
            Field::ImageY => &self.image_y,
            Field::CropX => &self.crop_x,
            Field::CropY => &self.crop_y,
            Field::ImageRotation => &self.image_rotation,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.slot_mut(field) = value.into();
    }

    fn slot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::BeerName => &mut self.beer_name,
            Field::Subtitle => &mut self.subtitle,
            Field::Abv => &mut self.abv,
            Field::BeerSize => &mut self.beer_size,
            Field::BorderColor => &mut self.border_color,
            Field::TextColor => &mut self.text_color,
            Field::Font => &mut self.font,
            Field::FontSize => &mut self.font_size,
            Field::ImageX => &mut self.image_x,
            Field::ImageY => &mut self.image_y,
            Field::CropX => &mut self.crop_x,
            Field::CropY => &mut self.crop_y,
            Field::ImageRotation => &mut self.image_rotation,
        }
    }

    /// Name/value pairs as a multipart form would carry them
    pub fn form_fields(&self, protocol: ProtocolVersion) -> Vec<(&'static str, String)> {
        Field::for_protocol(protocol)
            .map(|f| (f.name(protocol), self.get(f).to_string()))
            .collect()
    }

    /// The draft as a JSON `label_data` object. Numeric fields become
    /// integers (leading-integer parse, `null` when there is none).
    pub fn label_data(&self, protocol: ProtocolVersion) -> Value {
        let mut map = Map::new();
        for field in Field::for_protocol(protocol) {
            let raw = self.get(field);
            let value = if field.is_numeric() {
                parse_int_prefix(raw).map(Value::from).unwrap_or(Value::Null)
            } else {
                Value::String(raw.to_string())
            };
            map.insert(field.name(protocol).to_string(), value);
        }
        Value::Object(map)
    }

    /// Copy every recognized key of `data` into the draft. Returns the fields
    /// that were set, in form order.
    pub fn apply_initial(&mut self, data: &Map<String, Value>, protocol: ProtocolVersion) -> Vec<Field> {
        let mut applied = Vec::new();
        for (key, value) in data {
            let Some(field) = Field::from_name(key) else {
                continue;
            };
            if !field.is_available(protocol) {
                continue;
            }
            if let Some(text) = value_as_field_text(value) {
                self.set(field, text);
                if !applied.contains(&field) {
                    applied.push(field);
                }
            }
        }
        applied.sort();
        applied
    }

    pub fn display_for(&self, field: Field, protocol: ProtocolVersion) -> Option<DerivedDisplay> {
        let name = field.name(protocol);
        if field.is_percentage_range() {
            Some(DerivedDisplay {
                element_id: format!("{}_value", name),
                text: format!("{}%", self.get(field)),
            })
        } else if field.is_color() {
            Some(DerivedDisplay {
                element_id: format!("{}_preview", name),
                text: self.get(field).to_uppercase(),
            })
        } else {
            None
        }
    }

    /// Every derived display for the fields on the `protocol` form
    pub fn displays(&self, protocol: ProtocolVersion) -> Vec<DerivedDisplay> {
        Field::for_protocol(protocol)
            .filter_map(|f| self.display_for(f, protocol))
            .collect()
    }
}

/// Parse the leading integer of `s` the way form scripts do: optional sign,
/// then digits, anything after is ignored.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Render a JSON value the way a form input would display it
fn value_as_field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            // f64 Display drops the fraction of whole numbers (`30.0` -> `30`)
            if n.is_f64() {
                n.as_f64().map(|f| f.to_string())
            } else {
                Some(n.to_string())
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subtitle_wire_name_depends_on_protocol() {
        assert_eq!(Field::Subtitle.name(ProtocolVersion::V1), "brewer_name");
        assert_eq!(Field::Subtitle.name(ProtocolVersion::V2), "subtitle");
        assert_eq!(Field::from_name("brewer_name"), Some(Field::Subtitle));
        assert_eq!(Field::from_name("subtitle"), Some(Field::Subtitle));
        assert_eq!(Field::from_name("image_scale"), None);
    }

    #[test]
    fn protocol_field_sets() {
        let v1: Vec<_> = Field::for_protocol(ProtocolVersion::V1).collect();
        let v2: Vec<_> = Field::for_protocol(ProtocolVersion::V2).collect();
        assert_eq!(v1.len(), 12);
        assert_eq!(v2.len(), 12);
        assert!(v1.contains(&Field::ImageRotation) && !v1.contains(&Field::CropY));
        assert!(v2.contains(&Field::CropY) && !v2.contains(&Field::ImageRotation));
    }

    #[test]
    fn crop_is_release_only_in_v2() {
        assert_eq!(Field::CropX.trigger(ProtocolVersion::V1), FieldTrigger::Continuous);
        assert_eq!(Field::CropX.trigger(ProtocolVersion::V2), FieldTrigger::ReleaseOnly);
        assert!(!FieldTrigger::ReleaseOnly.fires_on(FieldEvent::Input));
        assert!(FieldTrigger::ReleaseOnly.fires_on(FieldEvent::Change));
        assert!(FieldTrigger::Continuous.fires_on(FieldEvent::Input));
    }

    #[test]
    fn parse_int_prefix_matches_form_semantics() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix(" 12.7"), Some(12));
        assert_eq!(parse_int_prefix("-15deg"), Some(-15));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn label_data_uses_numbers_for_numeric_fields() {
        let mut draft = LabelDraft::default();
        draft.set(Field::BeerName, "Stout");
        draft.set(Field::FontSize, "30");
        draft.set(Field::ImageRotation, "");
        let data = draft.label_data(ProtocolVersion::V1);
        assert_eq!(data["beer_name"], json!("Stout"));
        assert_eq!(data["font_size"], json!(30));
        assert_eq!(data["image_rotation"], Value::Null);
        assert_eq!(data["brewer_name"], json!(""));
        assert!(data.get("crop_y").is_none());
    }

    #[test]
    fn apply_initial_sets_known_fields_only() {
        let mut draft = LabelDraft::default();
        let data = json!({"beer_name": "Pale Ale", "crop_x": 30, "crop_y": 12.5, "design_type": "x"});
        let applied = draft.apply_initial(data.as_object().unwrap(), ProtocolVersion::V2);
        assert_eq!(applied, vec![Field::BeerName, Field::CropX, Field::CropY]);
        assert_eq!(draft.beer_name, "Pale Ale");
        assert_eq!(draft.crop_x, "30");
        assert_eq!(draft.crop_y, "12.5");
    }

    #[test]
    fn whole_floats_render_without_fraction_or_saturation() {
        let mut draft = LabelDraft::default();
        let data = json!({"font_size": 30.0, "image_x": 1e20, "crop_x": 18446744073709551615u64});
        draft.apply_initial(data.as_object().unwrap(), ProtocolVersion::V2);
        assert_eq!(draft.font_size, "30");
        assert_eq!(draft.image_x, "100000000000000000000");
        assert_eq!(draft.crop_x, "18446744073709551615");
    }

    #[test]
    fn displays_cover_ranges_and_colors() {
        let mut draft = LabelDraft::default();
        draft.set(Field::BorderColor, "#ff00aa");
        let crop = draft.display_for(Field::CropX, ProtocolVersion::V2).unwrap();
        assert_eq!(crop.element_id, "crop_x_value");
        assert_eq!(crop.text, "50%");
        let border = draft.display_for(Field::BorderColor, ProtocolVersion::V2).unwrap();
        assert_eq!(border.element_id, "border_color_preview");
        assert_eq!(border.text, "#FF00AA");
        assert!(draft.display_for(Field::Font, ProtocolVersion::V2).is_none());
        assert_eq!(draft.displays(ProtocolVersion::V1).len(), 5);
        assert_eq!(draft.displays(ProtocolVersion::V2).len(), 6);
    }
}
