pub mod film_metadata;
pub mod shared_film_metadata;
