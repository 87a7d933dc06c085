// Message elements and the message chain.
//
// A chain is an ordered list of tagged elements. When a `Source` element is
// present the gateway always puts it first; stringifying a chain
// concatenates the display form of every element except `Source` and
// unsupported ones.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};

/// Metadata of a received message, used to reference it later (recall,
/// quote). Always the first element of a received chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Message id, used for quote replies and recall
    pub id: i64,
    /// Unix timestamp
    pub time: i64,
}

/// Quote reply to an earlier message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Message id of the quoted message
    pub id: i64,
    /// Group the quoted message was received in; 0 for friend messages
    pub group_id: i64,
    pub sender_id: i64,
    /// Account (or group) the quoted message was sent to
    pub target_id: i64,
    pub origin: MessageChain,
}

/// Mention of one group member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct At {
    pub target: i64,
    /// Display text; ignored when sending
    #[serde(default)]
    pub display: String,
}

/// Mention of every group member
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AtAll {}

/// Built-in emoticon, by id or by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Face {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Plain text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plain {
    pub text: String,
}

impl Plain {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// An image, by id, url, local path or base64 payload (in that priority)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// A flash image; same addressing as [`Image`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// A voice clip
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    /// Clip length; absent when sending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
}

/// Raw XML card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Xml {
    pub xml: String,
}

/// Raw JSON card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Json {
    pub json: String,
}

/// Mini-app card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub content: String,
}

/// A poke message (the message form, not the nudge action)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poke {
    /// Poke, ShowLove, Like, Heartbroken, SixSixSix or FangDaZhao
    pub name: String,
}

/// Magic dice emoticon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dice {
    pub value: i64,
}

/// Marketplace emoticon; receive and forward only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFace {
    pub id: i64,
    pub name: String,
}

/// Music share card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicShare {
    pub kind: String,
    pub title: String,
    pub summary: String,
    pub jump_url: String,
    pub picture_url: String,
    pub music_url: String,
    pub brief: String,
}

/// One node of a merged forward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardNode {
    pub sender_id: i64,
    pub time: i64,
    pub sender_name: String,
    pub message_chain: MessageChain,
    /// A cached message can be referenced by id alone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Merged forward message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forward {
    pub node_list: Vec<ForwardNode>,
}

/// A file sent to a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub name: String,
    pub size: i64,
}

/// Mirai code text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiraiCode {
    pub code: String,
}

/// One element of a message chain, discriminated on the wire by `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageElement {
    Source(Source),
    Quote(Quote),
    At(At),
    AtAll(AtAll),
    Face(Face),
    Plain(Plain),
    Image(Image),
    FlashImage(FlashImage),
    Voice(Voice),
    Xml(Xml),
    Json(Json),
    App(App),
    Poke(Poke),
    Dice(Dice),
    MarketFace(MarketFace),
    MusicShare(MusicShare),
    Forward(Forward),
    File(File),
    MiraiCode(MiraiCode),
    /// An element type this crate does not know; kept verbatim
    Unsupported(Value),
}

impl MessageElement {
    /// Decodes one element by its `type` tag; unknown tags are kept raw.
    pub fn from_value(value: Value) -> Result<MessageElement> {
        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Ok(MessageElement::Unsupported(value));
        };
        let element = match tag {
            "Source" => MessageElement::Source(serde_json::from_value(value)?),
            "Quote" => MessageElement::Quote(serde_json::from_value(value)?),
            "At" => MessageElement::At(serde_json::from_value(value)?),
            "AtAll" => MessageElement::AtAll(AtAll {}),
            "Face" => MessageElement::Face(serde_json::from_value(value)?),
            "Plain" => MessageElement::Plain(serde_json::from_value(value)?),
            "Image" => MessageElement::Image(serde_json::from_value(value)?),
            "FlashImage" => MessageElement::FlashImage(serde_json::from_value(value)?),
            "Voice" => MessageElement::Voice(serde_json::from_value(value)?),
            "Xml" => MessageElement::Xml(serde_json::from_value(value)?),
            "Json" => MessageElement::Json(serde_json::from_value(value)?),
            "App" => MessageElement::App(serde_json::from_value(value)?),
            "Poke" => MessageElement::Poke(serde_json::from_value(value)?),
            "Dice" => MessageElement::Dice(serde_json::from_value(value)?),
            "MarketFace" => MessageElement::MarketFace(serde_json::from_value(value)?),
            "MusicShare" => MessageElement::MusicShare(serde_json::from_value(value)?),
            "Forward" => MessageElement::Forward(serde_json::from_value(value)?),
            "File" => MessageElement::File(serde_json::from_value(value)?),
            "MiraiCode" => MessageElement::MiraiCode(serde_json::from_value(value)?),
            _ => MessageElement::Unsupported(value),
        };
        Ok(element)
    }

    /// Encodes the element as a tagged JSON object.
    pub fn to_value(&self) -> Result<Value> {
        fn tagged<T: Serialize>(tag: &str, inner: &T) -> Result<Value> {
            let mut value = serde_json::to_value(inner)?;
            match value.as_object_mut() {
                Some(object) => {
                    object.insert("type".into(), Value::String(tag.into()));
                    Ok(value)
                }
                None => Err(Error::Json(format!("element {tag} is not a JSON object"))),
            }
        }
        match self {
            MessageElement::Source(e) => tagged("Source", e),
            MessageElement::Quote(e) => tagged("Quote", e),
            MessageElement::At(e) => tagged("At", e),
            MessageElement::AtAll(e) => tagged("AtAll", e),
            MessageElement::Face(e) => tagged("Face", e),
            MessageElement::Plain(e) => tagged("Plain", e),
            MessageElement::Image(e) => tagged("Image", e),
            MessageElement::FlashImage(e) => tagged("FlashImage", e),
            MessageElement::Voice(e) => tagged("Voice", e),
            MessageElement::Xml(e) => tagged("Xml", e),
            MessageElement::Json(e) => tagged("Json", e),
            MessageElement::App(e) => tagged("App", e),
            MessageElement::Poke(e) => tagged("Poke", e),
            MessageElement::Dice(e) => tagged("Dice", e),
            MessageElement::MarketFace(e) => tagged("MarketFace", e),
            MessageElement::MusicShare(e) => tagged("MusicShare", e),
            MessageElement::Forward(e) => tagged("Forward", e),
            MessageElement::File(e) => tagged("File", e),
            MessageElement::MiraiCode(e) => tagged("MiraiCode", e),
            MessageElement::Unsupported(raw) => Ok(raw.clone()),
        }
    }
}

impl fmt::Display for MessageElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageElement::Source(_) | MessageElement::Unsupported(_) => Ok(()),
            MessageElement::Quote(_) => write!(f, "[quote]"),
            MessageElement::At(e) => write!(f, "@{}", e.target),
            MessageElement::AtAll(_) => write!(f, "@all"),
            MessageElement::Face(e) => match (&e.name, e.face_id) {
                (Some(name), _) => write!(f, "[{name}]"),
                (None, Some(id)) => write!(f, "[face:{id}]"),
                (None, None) => write!(f, "[face]"),
            },
            MessageElement::Plain(e) => f.write_str(&e.text),
            MessageElement::Image(_) => write!(f, "[image]"),
            MessageElement::FlashImage(_) => write!(f, "[flash image]"),
            MessageElement::Voice(_) => write!(f, "[voice]"),
            MessageElement::Xml(_) => write!(f, "[xml]"),
            MessageElement::Json(_) => write!(f, "[json]"),
            MessageElement::App(_) => write!(f, "[app]"),
            MessageElement::Poke(_) => write!(f, "[poke]"),
            MessageElement::Dice(e) => write!(f, "[dice:{}]", e.value),
            MessageElement::MarketFace(e) => {
                if e.name.starts_with('[') && e.name.ends_with(']') {
                    f.write_str(&e.name)
                } else {
                    write!(f, "[{}]", e.name)
                }
            }
            MessageElement::MusicShare(e) => write!(f, "[share]{}", e.title),
            MessageElement::Forward(_) => write!(f, "[forward]"),
            MessageElement::File(e) => write!(f, "[file]{}", e.name),
            MessageElement::MiraiCode(e) => f.write_str(&e.code),
        }
    }
}

impl Serialize for MessageElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let value = self
            .to_value()
            .map_err(|e| serde::ser::Error::custom(e.to_string()))?;
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MessageElement {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<MessageElement, D::Error> {
        let value = Value::deserialize(deserializer)?;
        MessageElement::from_value(value).map_err(|e| D::Error::custom(e.to_string()))
    }
}

/// An ordered sequence of message elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageChain(pub Vec<MessageElement>);

impl MessageChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain of a single plain-text element.
    pub fn plain(text: impl Into<String>) -> Self {
        Self(vec![MessageElement::Plain(Plain::new(text))])
    }

    pub fn push(&mut self, element: MessageElement) {
        self.0.push(element);
    }

    /// Builder-style append.
    pub fn with(mut self, element: MessageElement) -> Self {
        self.0.push(element);
        self
    }

    pub fn elements(&self) -> &[MessageElement] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MessageElement> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The source metadata, when present (always the first element).
    pub fn source(&self) -> Option<&Source> {
        match self.0.first() {
            Some(MessageElement::Source(s)) => Some(s),
            _ => None,
        }
    }

    /// Texts of every plain element, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|e| match e {
                MessageElement::Plain(p) => Some(p.text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text of the first plain element.
    pub fn first_text(&self) -> Option<&str> {
        self.texts().first().copied()
    }

    /// Targets of every mention, in order.
    pub fn at_targets(&self) -> Vec<i64> {
        self.0
            .iter()
            .filter_map(|e| match e {
                MessageElement::At(at) => Some(at.target),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for MessageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.0 {
            element.fmt(f)?;
        }
        Ok(())
    }
}

impl From<&str> for MessageChain {
    fn from(text: &str) -> Self {
        MessageChain::plain(text)
    }
}

impl From<String> for MessageChain {
    fn from(text: String) -> Self {
        MessageChain::plain(text)
    }
}

impl From<Vec<MessageElement>> for MessageChain {
    fn from(elements: Vec<MessageElement>) -> Self {
        MessageChain(elements)
    }
}

impl FromIterator<MessageElement> for MessageChain {
    fn from_iter<I: IntoIterator<Item = MessageElement>>(iter: I) -> Self {
        MessageChain(iter.into_iter().collect())
    }
}

impl IntoIterator for MessageChain {
    type Item = MessageElement;
    type IntoIter = std::vec::IntoIter<MessageElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MessageChain {
    type Item = &'a MessageElement;
    type IntoIter = std::slice::Iter<'a, MessageElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_chain() -> MessageChain {
        serde_json::from_value(json!([
            {"type": "Source", "id": 100, "time": 1700000000},
            {"type": "Plain", "text": "hello "},
            {"type": "At", "target": 123, "display": "@alice"},
            {"type": "Plain", "text": " world"},
            {"type": "BrandNewThing", "payload": 1}
        ]))
        .unwrap()
    }

    #[test]
    fn display_skips_source_and_unsupported() {
        assert_eq!(sample_chain().to_string(), "hello @123 world");
    }

    #[test]
    fn source_is_first_element() {
        let chain = sample_chain();
        assert_eq!(chain.source().unwrap().id, 100);
        let no_source = MessageChain::plain("x");
        assert!(no_source.source().is_none());
    }

    #[test]
    fn texts_and_at_targets() {
        let chain = sample_chain();
        assert_eq!(chain.texts(), vec!["hello ", " world"]);
        assert_eq!(chain.first_text(), Some("hello "));
        assert_eq!(chain.at_targets(), vec![123]);
    }

    #[test]
    fn unknown_element_survives_round_trip() {
        let chain = sample_chain();
        let value = serde_json::to_value(&chain).unwrap();
        assert_eq!(value[4], json!({"type": "BrandNewThing", "payload": 1}));
    }

    #[test]
    fn element_serialization_carries_type_tag() {
        let at = MessageElement::At(At {
            target: 5,
            display: String::new(),
        });
        assert_eq!(
            serde_json::to_value(&at).unwrap(),
            json!({"type": "At", "target": 5, "display": ""})
        );
    }

    #[test]
    fn plain_chain_from_str() {
        let chain: MessageChain = "hi".into();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.to_string(), "hi");
    }
}
