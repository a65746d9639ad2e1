use crate::{
    error::{
        Error,
        Result,
    },
    ledger::{
        ObjectFields,
        ObjectId,
        OwnedObject,
    },
    moves::MoveChoice,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use tracing::debug;

const UNNAMED: &str = "Unnamed collectible";

/// An owned collectible that can stand in for one move's artwork.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image_url: String,
    #[serde(rename = "type")]
    pub move_type: MoveChoice,
}

/// Keeps the objects that decode into collectibles and drops the rest.
pub fn decode_owned(objects: &[OwnedObject]) -> Vec<Collectible> {
    objects
        .iter()
        .filter_map(|object| {
            let decoded = decode_one(&object.id, &object.fields);
            if decoded.is_none() {
                debug!(object = %object.id, "skipping object without move type or image");
            }
            decoded
        })
        .collect()
}

pub fn decode_one(id: &ObjectId, fields: &ObjectFields) -> Option<Collectible> {
    let description = text_field(fields, "description").unwrap_or_default();
    let move_type = text_field(fields, "gesture")
        .and_then(|gesture| MoveChoice::from_label(&gesture))
        .or_else(|| MoveChoice::from_label(&description))?;
    let image_url = image_field(fields).filter(|url| !url.is_empty())?;
    let name = text_field(fields, "name").unwrap_or_else(|| UNNAMED.to_string());
    Some(Collectible {
        id: id.clone(),
        name,
        description,
        image_url,
        move_type,
    })
}

// `string::String` arrives either plain or as `{ bytes }`.
fn text_field(fields: &ObjectFields, field: &str) -> Option<String> {
    match fields.get(field)? {
        Value::String(text) => Some(text.clone()),
        Value::Object(inner) => inner.get("bytes")?.as_str().map(str::to_string),
        _ => None,
    }
}

// `url::Url` arrives as a string, `{ url }` or `{ fields: { url } }`.
fn image_field(fields: &ObjectFields) -> Option<String> {
    let value = fields.get("image_url")?;
    if let Some(url) = value.as_str() {
        return Some(url.to_string());
    }
    value
        .get("url")
        .or_else(|| value.get("fields").and_then(|inner| inner.get("url")))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintRequest {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub move_type: MoveChoice,
}

impl MintRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidMintRequest("name is required".to_string()));
        }
        if self.image_url.trim().is_empty() {
            return Err(Error::InvalidMintRequest(
                "image url is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::address;
    use serde_json::json;

    fn owned(fields: Value) -> OwnedObject {
        OwnedObject {
            id: address(0x77),
            type_name: "0xabc::gg_nft::NFT".to_string(),
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn decode_one__prefers_gesture_over_description() {
        // given
        let object = owned(json!({
            "name": "Stone",
            "description": "looks like paper",
            "gesture": "rock",
            "image_url": "https://img/stone.png",
        }));

        // when
        let collectible = decode_one(&object.id, &object.fields).unwrap();

        // then
        assert_eq!(collectible.move_type, MoveChoice::Rock);
        assert_eq!(collectible.name, "Stone");
    }

    #[test]
    fn decode_one__reads_wrapped_strings_and_urls() {
        // given
        let object = owned(json!({
            "name": { "bytes": "Cutter" },
            "description": { "bytes": "Cây kéo vàng" },
            "image_url": { "fields": { "url": "https://img/cut.png" } },
        }));

        // when
        let collectible = decode_one(&object.id, &object.fields).unwrap();

        // then
        assert_eq!(collectible.move_type, MoveChoice::Scissors);
        assert_eq!(collectible.name, "Cutter");
        assert_eq!(collectible.image_url, "https://img/cut.png");
    }

    #[test]
    fn decode_owned__skips_objects_without_move_or_image() {
        // given
        let objects = vec![
            owned(json!({ "description": "a lizard", "image_url": "https://img/l.png" })),
            owned(json!({ "description": "paper plane" })),
            owned(json!({ "description": "paper plane", "image_url": { "url": "https://img/p.png" } })),
        ];

        // when
        let collectibles = decode_owned(&objects);

        // then
        assert_eq!(collectibles.len(), 1);
        assert_eq!(collectibles[0].move_type, MoveChoice::Paper);
        assert_eq!(collectibles[0].name, UNNAMED);
    }

    #[test]
    fn decode_one__skips_descriptions_that_mention_several_moves() {
        // given
        let object = owned(json!({
            "name": "Wrapper",
            "description": "A paper sheet that wraps any rock",
            "image_url": "https://img/w.png",
        }));

        // when
        let collectible = decode_one(&object.id, &object.fields);

        // then
        assert_eq!(collectible, None);
    }

    #[test]
    fn decode_one__ignores_moves_embedded_in_longer_words() {
        // given
        let object = owned(json!({
            "name": "Smoke",
            "description": "Smokeout rock",
            "image_url": "https://img/s.png",
        }));

        // when
        let collectible = decode_one(&object.id, &object.fields).unwrap();

        // then
        assert_eq!(collectible.move_type, MoveChoice::Rock);
    }

    #[test]
    fn validate__requires_name_and_image() {
        let mut request = MintRequest {
            name: "  ".to_string(),
            description: String::new(),
            image_url: "https://img/x.png".to_string(),
            move_type: MoveChoice::Paper,
        };
        assert!(matches!(request.validate(), Err(Error::InvalidMintRequest(_))));

        request.name = "Sheet".to_string();
        request.image_url = String::new();
        assert!(matches!(request.validate(), Err(Error::InvalidMintRequest(_))));

        request.image_url = "https://img/x.png".to_string();
        assert_eq!(request.validate(), Ok(()));
    }
}
