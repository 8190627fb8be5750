/// Astronomical unit in meters
pub const AU: f64 = 1.495978707e11;

/// Newtonian constant of gravitation (m³ kg⁻¹ s⁻²), CODATA 2018
pub const G: f64 = 6.67430e-11;

/// Heliocentric gravitational constant (m³/s²)
pub const GM_SUN: f64 = 1.32712440041e20;

/// Nominal solar mass in kg (GM_SUN / G)
pub const M_SUN: f64 = GM_SUN / G;

/// Earth mass in kg
pub const M_EARTH: f64 = 5.9722e24;

/// Jupiter mass in kg
pub const M_JUPITER: f64 = 1.898125e27;

/// Seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days in a Julian year
pub const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

/// Days in a Julian century
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

/// Julian Date of J2000.0 (2000-01-01T12:00:00 TDB)
pub const J2000_JD: f64 = 2_451_545.0;

/// Offset between Julian Date and Modified Julian Date
pub const MJD_OFFSET: f64 = 2_400_000.5;

/// Mean obliquity of the ecliptic at J2000 (radians), IAU 1976: 84381.448"
pub const OBLIQUITY_J2000: f64 = 84_381.448 / 3600.0 * std::f64::consts::PI / 180.0;

/// Parsec in meters
pub const PARSEC: f64 = 3.0856775814913673e16;

/// Light year in meters
pub const LIGHT_YEAR: f64 = 9.4607304725808e15;
