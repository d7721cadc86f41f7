use crate::models::{Animal, Gender, Size, Species};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct AnimalFilter {
    pub species: Option<Species>,
    // Matched case-insensitively against name and breed
    pub query: Option<String>,
    pub include_adopted: bool,
}

/// Adoptable animals shown on the browse page.
#[derive(Debug, Clone)]
pub struct Catalog {
    animals: Vec<Animal>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(builtin_animals())
    }
}

impl Catalog {
    pub fn new(animals: Vec<Animal>) -> Self {
        Self { animals }
    }

    pub fn all(&self) -> &[Animal] {
        &self.animals
    }

    pub fn get(&self, id: u32) -> Option<&Animal> {
        self.animals.iter().find(|a| a.id == id)
    }

    pub fn filter(&self, filter: &AnimalFilter) -> Vec<&Animal> {
        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        self.animals
            .iter()
            .filter(|a| filter.include_adopted || !a.adopted)
            .filter(|a| filter.species.map_or(true, |s| a.species == s))
            .filter(|a| match &query {
                Some(q) => a.name.to_lowercase().contains(q) || a.breed.to_lowercase().contains(q),
                None => true,
            })
            .collect()
    }

    /// Favorited animals that still exist in the catalog, in id order.
    pub fn resolve_favorites(&self, ids: &BTreeSet<u32>) -> Vec<&Animal> {
        ids.iter().filter_map(|id| self.get(*id)).collect()
    }
}

fn animal(
    id: u32,
    name: &str,
    species: Species,
    breed: &str,
    age_years: u8,
    gender: Gender,
    size: Size,
    description: &str,
) -> Animal {
    Animal {
        id,
        name: name.to_string(),
        species,
        breed: breed.to_string(),
        age_years,
        gender,
        size,
        description: description.to_string(),
        image_url: format!("/images/animals/{}.jpg", id),
        adopted: false,
    }
}

fn builtin_animals() -> Vec<Animal> {
    let mut animals = vec![
        animal(1, "Buddy", Species::Dog, "Deshi Mix", 3, Gender::Male, Size::Medium,
            "Rescued from a busy market street, Buddy loves long walks and belly rubs."),
        animal(2, "Mishti", Species::Cat, "Domestic Shorthair", 2, Gender::Female, Size::Small,
            "A gentle lap cat who purrs the moment you sit down."),
        animal(3, "Raja", Species::Dog, "German Shepherd Mix", 5, Gender::Male, Size::Large,
            "Calm and loyal, Raja is great with older children."),
        animal(4, "Tuni", Species::Bird, "Rose-ringed Parakeet", 1, Gender::Female, Size::Small,
            "Chatty and curious, Tuni is learning her first words."),
        animal(5, "Kalo", Species::Cat, "Bombay Mix", 4, Gender::Male, Size::Medium,
            "Independent but affectionate once he trusts you."),
        animal(6, "Cotton", Species::Rabbit, "Lionhead", 1, Gender::Female, Size::Small,
            "Fluffy, litter trained and fond of fresh greens."),
        animal(7, "Lalu", Species::Dog, "Deshi", 8, Gender::Male, Size::Medium,
            "A senior gentleman looking for a quiet home to retire in."),
    ];
    // Kept on the page as a success story
    animals.push(Animal {
        adopted: true,
        ..animal(8, "Pakhi", Species::Cat, "Siamese Mix", 3, Gender::Female, Size::Small,
            "Adopted in spring and now rules her new family's balcony.")
    });
    animals
}
