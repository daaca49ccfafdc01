//! Movie resource types and test data generation

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored movie as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub rating: f64,
    pub director: String,
}

/// Request body for creating a movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub name: String,
    pub year: i32,
    pub rating: f64,
    pub director: String,
}

impl NewMovie {
    pub fn with_id(&self, id: i64) -> Movie {
        Movie {
            id,
            name: self.name.clone(),
            year: self.year,
            rating: self.rating,
            director: self.director.clone(),
        }
    }

    /// The body as a JSON object, for building response expectations
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "year": self.year,
            "rating": self.rating,
            "director": self.director,
        })
    }
}

/// Partial update body; absent fields are left unchanged by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
}

impl From<NewMovie> for MovieUpdate {
    fn from(movie: NewMovie) -> Self {
        Self {
            name: Some(movie.name),
            year: Some(movie.year),
            rating: Some(movie.rating),
            director: Some(movie.director),
        }
    }
}

/// Standard `{ status, data }` envelope of successful API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse<T> {
    pub status: u16,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

const ADJECTIVES: &[&str] = &[
    "Silent", "Crimson", "Last", "Hidden", "Electric", "Broken", "Golden", "Midnight", "Distant", "Savage",
];

const NOUNS: &[&str] = &[
    "Harbor", "Frontier", "Empire", "Signal", "Orchard", "Protocol", "Horizon", "Verdict", "Tide", "Garden",
];

const DIRECTORS: &[&str] = &[
    "Christopher Nolan",
    "Kathryn Bigelow",
    "Denis Villeneuve",
    "Greta Gerwig",
    "Bong Joon-ho",
    "Sofia Coppola",
    "Ridley Scott",
    "Agnes Varda",
];

/// A random movie without an id; the name carries a random suffix so
/// name lookups stay unique across runs
pub fn generate_movie_without_id() -> NewMovie {
    let mut rng = rand::thread_rng();

    let name = format!(
        "{} {} {:04x}",
        ADJECTIVES.choose(&mut rng).copied().unwrap_or("Untitled"),
        NOUNS.choose(&mut rng).copied().unwrap_or("Movie"),
        rng.gen::<u16>()
    );
    let director = DIRECTORS.choose(&mut rng).copied().unwrap_or("Unknown").to_string();

    NewMovie {
        name,
        year: rng.gen_range(1900..=2024),
        // one decimal place, 0.0 - 10.0
        rating: f64::from(rng.gen_range(0..=100u8)) / 10.0,
        director,
    }
}
