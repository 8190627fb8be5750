//! Named collections of perturbers

use crate::body::Perturber;
use crate::error::{SimError, SimResult};
use crate::planets::Body;

/// The massive bodies a session starts from
#[derive(Clone, Debug, Default)]
pub struct PerturberModel {
    perturbers: Vec<Perturber>,
}

impl PerturberModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in models: `SUN`, `GIANTS`, `PLANETS`, `ALL` (case-insensitive)
    pub fn builtin(name: &str) -> SimResult<Self> {
        let bodies: Vec<Body> = match name.trim().to_ascii_uppercase().as_str() {
            "SUN" => vec![Body::Sun],
            "GIANTS" => std::iter::once(Body::Sun).chain(Body::giants().iter().copied()).collect(),
            "PLANETS" => std::iter::once(Body::Sun).chain(Body::planets().iter().copied()).collect(),
            "ALL" => Body::all().to_vec(),
            _ => return Err(SimError::UnknownModel(name.to_string())),
        };
        Ok(Self::from_bodies(&bodies))
    }

    pub fn from_bodies(bodies: &[Body]) -> Self {
        Self { perturbers: bodies.iter().map(Body::perturber).collect() }
    }

    /// Append a perturber; names must be unique
    pub fn add(&mut self, perturber: Perturber) -> SimResult<()> {
        if self.get(&perturber.name).is_some() {
            return Err(SimError::DuplicateBody(perturber.name));
        }
        self.perturbers.push(perturber);
        Ok(())
    }

    pub fn with(mut self, perturber: Perturber) -> SimResult<Self> {
        self.add(perturber)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Perturber> {
        self.perturbers.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.perturbers.iter().map(|p| p.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Perturber> {
        self.perturbers.iter()
    }

    pub fn len(&self) -> usize {
        self.perturbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perturbers.is_empty()
    }
}
