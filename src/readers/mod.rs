pub mod city_reader;
pub mod reading_reader;

pub use city_reader::CityReader;
pub use reading_reader::ReadingReader;
