/// Patient profile attached to a session.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => f.write_str("Male"),
            Gender::Female => f.write_str("Female"),
            Gender::Other => f.write_str("Other"),
        }
    }
}

/// Unvalidated profile fields, as read from config or a request body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileInput {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
}

/// A saved profile. BMI is derived once at save time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: f64,
}

impl Profile {
    pub const AGE_MAX: u32 = 120;
    pub const HEIGHT_CM: (f64, f64) = (50.0, 250.0);
    pub const WEIGHT_KG: (f64, f64) = (10.0, 300.0);

    /// Report lines in display order.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.name.clone()),
            ("Age", self.age.to_string()),
            ("Gender", self.gender.to_string()),
            ("Height", format!("{} cm", self.height_cm)),
            ("Weight", format!("{} kg", self.weight_kg)),
            ("BMI", format!("{:.1}", self.bmi)),
        ]
    }
}

impl TryFrom<ProfileInput> for Profile {
    type Error = ProfileError;

    fn try_from(input: ProfileInput) -> Result<Self, Self::Error> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ProfileError::MissingName);
        }
        if input.age == 0 || input.age > Self::AGE_MAX {
            return Err(ProfileError::Age(input.age));
        }
        let (h_min, h_max) = Self::HEIGHT_CM;
        if !(input.height_cm >= h_min && input.height_cm <= h_max) {
            return Err(ProfileError::Height(input.height_cm));
        }
        let (w_min, w_max) = Self::WEIGHT_KG;
        if !(input.weight_kg >= w_min && input.weight_kg <= w_max) {
            return Err(ProfileError::Weight(input.weight_kg));
        }

        Ok(Self {
            name,
            age: input.age,
            gender: input.gender,
            height_cm: input.height_cm,
            weight_kg: input.weight_kg,
            bmi: bmi(input.weight_kg, input.height_cm),
        })
    }
}

/// Body-mass index rounded to one decimal.
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let metres = height_cm / 100.0;
    (weight_kg / (metres * metres) * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    MissingName,
    Age(u32),
    Height(f64),
    Weight(f64),
}

impl std::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileError::MissingName => f.write_str("name is required"),
            ProfileError::Age(a) => write!(f, "age must be 1..={}, got {a}", Profile::AGE_MAX),
            ProfileError::Height(h) => write!(
                f,
                "height must be {}..={} cm, got {h}",
                Profile::HEIGHT_CM.0,
                Profile::HEIGHT_CM.1
            ),
            ProfileError::Weight(w) => write!(
                f,
                "weight must be {}..={} kg, got {w}",
                Profile::WEIGHT_KG.0,
                Profile::WEIGHT_KG.1
            ),
        }
    }
}

impl std::error::Error for ProfileError {}
