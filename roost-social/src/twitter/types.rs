//! Typed entities parsed out of raw API JSON, plus the pagination types.
//!
//! Raw payloads carry tweets as `{ rest_id, legacy: {...} }` and users as the
//! `result` object of a `user_results` node. Parsing never fails: anything the
//! payload does not provide stays at its zero value.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Field-level fallback: `null` or a value of the wrong type becomes the
/// zero value instead of failing the enclosing struct.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(T::deserialize(raw).unwrap_or_default())
}

/// Capability shared by entity variants: build a populated instance from raw JSON.
pub trait FromRaw: Sized {
    fn from_raw(raw: &Value) -> Self;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub author_id: String,
    pub lang: String,
    pub conversation_id: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub quoted: Option<String>,
    pub like_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TweetLegacy {
    #[serde(deserialize_with = "lenient")]
    full_text: String,
    #[serde(deserialize_with = "lenient")]
    created_at: String,
    #[serde(deserialize_with = "lenient")]
    user_id_str: String,
    #[serde(deserialize_with = "lenient")]
    lang: String,
    #[serde(deserialize_with = "lenient")]
    conversation_id_str: String,
    #[serde(deserialize_with = "lenient")]
    in_reply_to_status_id_str: Option<String>,
    #[serde(deserialize_with = "lenient")]
    quoted_status_id_str: Option<String>,
    #[serde(deserialize_with = "lenient")]
    favorite_count: u64,
    #[serde(deserialize_with = "lenient")]
    retweet_count: u64,
    #[serde(deserialize_with = "lenient")]
    reply_count: u64,
    #[serde(deserialize_with = "lenient")]
    quote_count: u64,
    #[serde(deserialize_with = "lenient")]
    entities: LegacyEntities,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyEntities {
    #[serde(deserialize_with = "lenient")]
    hashtags: Vec<HashtagEntity>,
    #[serde(deserialize_with = "lenient")]
    user_mentions: Vec<MentionEntity>,
    #[serde(deserialize_with = "lenient")]
    urls: Vec<UrlEntity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HashtagEntity {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MentionEntity {
    screen_name: String,
}

#[derive(Debug, Deserialize)]
struct UrlEntity {
    #[serde(default)]
    expanded_url: Option<String>,
}

impl Tweet {
    /// Build a tweet from its id and a `legacy`-shaped object.
    pub fn from_parts(rest_id: &str, legacy: &Value) -> Self {
        let legacy = TweetLegacy::deserialize(legacy).unwrap_or_else(|err| {
            tracing::debug!(tweet_id=%rest_id, error=%err, "tweet.legacy.unreadable");
            TweetLegacy::default()
        });
        let entities = legacy.entities;
        Self {
            id: rest_id.to_string(),
            text: legacy.full_text,
            created_at: legacy.created_at,
            author_id: legacy.user_id_str,
            lang: legacy.lang,
            conversation_id: legacy.conversation_id_str,
            reply_to: legacy.in_reply_to_status_id_str,
            quoted: legacy.quoted_status_id_str,
            like_count: legacy.favorite_count,
            retweet_count: legacy.retweet_count,
            reply_count: legacy.reply_count,
            quote_count: legacy.quote_count,
            hashtags: entities.hashtags.into_iter().map(|h| h.text).collect(),
            mentions: entities
                .user_mentions
                .into_iter()
                .map(|m| m.screen_name)
                .collect(),
            urls: entities
                .urls
                .into_iter()
                .filter_map(|u| u.expanded_url)
                .collect(),
        }
    }
}

impl FromRaw for Tweet {
    fn from_raw(raw: &Value) -> Self {
        // `TweetWithVisibilityResults` wraps the real tweet one level down.
        let raw = match raw.get("tweet") {
            Some(inner) if raw.get("legacy").is_none() => inner,
            _ => raw,
        };
        let Some(legacy) = raw.get("legacy") else {
            return Self::default();
        };
        let rest_id = raw
            .get("rest_id")
            .and_then(Value::as_str)
            .or_else(|| legacy.get("id_str").and_then(Value::as_str))
            .unwrap_or_default();
        Self::from_parts(rest_id, legacy)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub full_name: String,
    pub created_at: String,
    pub description: String,
    pub is_verified: bool,
    pub location: String,
    pub followers_count: u64,
    pub following_count: u64,
    pub favourites_count: u64,
    pub statuses_count: u64,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub pinned_tweet: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserLegacy {
    #[serde(deserialize_with = "lenient")]
    screen_name: String,
    #[serde(deserialize_with = "lenient")]
    name: String,
    #[serde(deserialize_with = "lenient")]
    created_at: String,
    #[serde(deserialize_with = "lenient")]
    description: String,
    #[serde(deserialize_with = "lenient")]
    verified: bool,
    #[serde(deserialize_with = "lenient")]
    location: String,
    #[serde(deserialize_with = "lenient")]
    followers_count: u64,
    #[serde(deserialize_with = "lenient")]
    friends_count: u64,
    #[serde(deserialize_with = "lenient")]
    favourites_count: u64,
    #[serde(deserialize_with = "lenient")]
    statuses_count: u64,
    #[serde(deserialize_with = "lenient")]
    profile_image_url_https: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pinned_tweet_ids_str: Vec<String>,
}

impl FromRaw for User {
    fn from_raw(raw: &Value) -> Self {
        let Some(legacy) = raw.get("legacy") else {
            return Self::default();
        };
        let id = raw
            .get("rest_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let legacy = UserLegacy::deserialize(legacy).unwrap_or_else(|err| {
            tracing::debug!(user_id=%id, error=%err, "user.legacy.unreadable");
            UserLegacy::default()
        });
        let blue = raw
            .get("is_blue_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self {
            id,
            user_name: legacy.screen_name,
            full_name: legacy.name,
            created_at: legacy.created_at,
            description: legacy.description,
            is_verified: legacy.verified || blue,
            location: legacy.location,
            followers_count: legacy.followers_count,
            following_count: legacy.friends_count,
            favourites_count: legacy.favourites_count,
            statuses_count: legacy.statuses_count,
            profile_image: legacy.profile_image_url_https,
            pinned_tweet: legacy.pinned_tweet_ids_str.into_iter().next(),
        }
    }
}

/// Entity variants, each stored in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Tweet,
    User,
}

impl EntityKind {
    pub const ALL: [EntityKind; 2] = [EntityKind::Tweet, EntityKind::User];

    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::Tweet => "Tweet",
            EntityKind::User => "User",
        }
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection_name() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Tweet(Tweet),
    User(User),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Tweet(_) => EntityKind::Tweet,
            Entity::User(_) => EntityKind::User,
        }
    }

    /// Rebuild an entity from a stored document of a known kind.
    pub fn from_document(kind: EntityKind, doc: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::Tweet => Entity::Tweet(serde_json::from_value(doc)?),
            EntityKind::User => Entity::User(serde_json::from_value(doc)?),
        })
    }
}

impl From<Tweet> for Entity {
    fn from(t: Tweet) -> Self {
        Entity::Tweet(t)
    }
}

impl From<User> for Entity {
    fn from(u: User) -> Self {
        Entity::User(u)
    }
}

/// Opaque pagination token. Empty means no further page was advertised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Cursor {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Cursor {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of results plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Cursor,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next: Cursor::default(),
        }
    }
}
