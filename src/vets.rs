use crate::models::Vet;

#[derive(Debug, Clone, Default)]
pub struct VetQuery {
    // Free text over name, city, address and services
    pub text: Option<String>,
    pub emergency_only: bool,
}

pub struct VetDirectory {
    vets: Vec<Vet>,
}

impl Default for VetDirectory {
    fn default() -> Self {
        Self::new(builtin_vets())
    }
}

impl VetDirectory {
    pub fn new(vets: Vec<Vet>) -> Self {
        Self { vets }
    }

    /// Matching clinics, best rated first.
    pub fn search(&self, query: &VetQuery) -> Vec<&Vet> {
        let terms: Vec<String> = query
            .text
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let mut found: Vec<&Vet> = self
            .vets
            .iter()
            .filter(|v| !query.emergency_only || v.emergency)
            .filter(|v| {
                let haystack = format!("{} {} {} {}", v.name, v.city, v.address, v.services.join(" ")).to_lowercase();
                terms.iter().all(|t| haystack.contains(t.as_str()))
            })
            .collect();
        found.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        found
    }

    pub fn cities(&self) -> Vec<&str> {
        let mut cities: Vec<&str> = self.vets.iter().map(|v| v.city.as_str()).collect();
        cities.sort_unstable();
        cities.dedup();
        cities
    }
}

fn vet(id: u32, name: &str, address: &str, city: &str, phone: &str, services: &[&str], emergency: bool, rating: f32) -> Vet {
    Vet {
        id,
        name: name.to_string(),
        address: address.to_string(),
        city: city.to_string(),
        phone: phone.to_string(),
        services: services.iter().map(|s| s.to_string()).collect(),
        emergency,
        rating,
    }
}

fn builtin_vets() -> Vec<Vet> {
    vec![
        vet(1, "Central Veterinary Hospital", "48 Kazi Alauddin Rd", "Dhaka", "+880 2-9552288",
            &["Surgery", "Vaccination", "X-ray"], true, 4.2),
        vet(2, "Paws & Claws Clinic", "House 12, Road 7, Dhanmondi", "Dhaka", "+880 1711-000111",
            &["Vaccination", "Grooming", "Dental"], false, 4.7),
        vet(3, "Chattogram Pet Care", "22 CDA Avenue", "Chattogram", "+880 1819-222333",
            &["Surgery", "Emergency", "Vaccination"], true, 4.5),
        vet(4, "Sylhet Animal Clinic", "5 Zindabazar", "Sylhet", "+880 1911-444555",
            &["Vaccination", "Deworming"], false, 4.0),
        vet(5, "Rajshahi Vet Point", "9 Shaheb Bazar", "Rajshahi", "+880 1511-666777",
            &["Surgery", "Ultrasound", "Emergency"], true, 3.9),
    ]
}
