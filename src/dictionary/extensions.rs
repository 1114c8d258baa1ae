//! CIF2-only field overlay.
//!
//! A handful of fields exist in the official dictionary with no CIF1 alias
//! at all, mostly newer electron-diffraction additions. Converting such a
//! field to CIF1 through the dictionary alone loses it. This overlay wraps
//! the parsed dictionary with a static table of reasonable CIF1 spellings
//! so round-trip conversion never drops them. Dictionary answers always win;
//! the overlay is consulted only when the dictionary has nothing.

use std::collections::HashMap;

use super::parser::DictionaryParser;

/// CIF2 name and its substitute CIF1 spelling, for fields the official
/// dictionary defines without any CIF1 alias.
const CIF2_ONLY_FIELDS: &[(&str, &str)] = &[
    // Refinement
    ("_refine.diffraction_theory", "_refine_diffraction_theory"),
    ("_refine.diffraction_theory_details", "_refine_diffraction_theory_details"),
    ("_refine_diff.potential_max", "_refine_diff_potential_max"),
    ("_refine_diff.potential_min", "_refine_diff_potential_min"),
    ("_refine_diff.potential_RMS", "_refine_diff_potential_RMS"),
    ("_refine_ls.abs_structure_z-score", "_refine_ls_abs_structure_z-score"),
    ("_refine_ls.sample_thickness", "_refine_ls_sample_thickness"),
    ("_refine_ls.sample_shape_expression", "_refine_ls_sample_shape_expression"),
    ("_refine_ls.sample_shape_details", "_refine_ls_sample_shape_details"),
    // Measurement
    ("_diffrn_measurement.method_precession", "_diffrn_measurement_method_precession"),
    ("_diffrn_measurement.rotation_mode", "_diffrn_measurement_rotation_mode"),
    ("_diffrn_measurement.sample_tracking", "_diffrn_measurement_sample_tracking"),
    ("_diffrn_measurement.sample_tracking_method", "_diffrn_measurement_sample_tracking_method"),
    // Source, for electron diffraction setups
    ("_diffrn_source.convergence_angle", "_diffrn_source_convergence_angle"),
    ("_diffrn_source.device", "_diffrn_source"),
    (
        "_diffrn_source.ed_diffracting_area_selection",
        "_diffrn_source_ed_diffracting_area_selection",
    ),
    // Radiation and illumination
    ("_diffrn_radiation.illumination_mode", "_diffrn_radiation_illumination_mode"),
    // Precession
    ("_diffrn.precession_semi_angle", "_diffrn_precession_semi_angle"),
    // Computing
    ("_computing.sample_tracking", "_computing_sample_tracking"),
    // Experimental
    ("_exptl_crystal.mosaicity", "_exptl_crystal_mosaicity"),
    ("_exptl_crystal.mosaic_method", "_exptl_crystal_mosaic_method"),
    ("_exptl_crystal.mosaic_block_size", "_exptl_crystal_mosaic_block_size"),
    // Flux and dose
    ("_diffrn.flux_density", "_diffrn_flux_density"),
    ("_diffrn.total_dose", "_diffrn_total_dose"),
    ("_diffrn.total_exposure_time", "_diffrn_total_exposure_time"),
];

/// Where a name is defined, used for reporting and conversion decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStatus {
    /// Present in the parsed dictionary.
    Official,
    /// Known only through the CIF2-only overlay table.
    Cif2OnlyExtension,
    Unknown,
}

/// A parsed dictionary plus the CIF2-only overlay, queried dictionary-first.
///
/// The overlay maps are owned by the instance and built at construction;
/// lookups are case-insensitive and answers keep the table's canonical
/// casing.
#[derive(Debug)]
pub struct ExtendedDictionary {
    base: DictionaryParser,
    cif2_to_cif1: HashMap<String, &'static str>,
    cif1_to_cif2: HashMap<String, &'static str>,
}

impl ExtendedDictionary {
    pub fn new(base: DictionaryParser) -> Self {
        ExtendedDictionary {
            base,
            cif2_to_cif1: CIF2_ONLY_FIELDS
                .iter()
                .map(|(cif2, cif1)| (cif2.to_lowercase(), *cif1))
                .collect(),
            cif1_to_cif2: CIF2_ONLY_FIELDS
                .iter()
                .map(|(cif2, cif1)| (cif1.to_lowercase(), *cif2))
                .collect(),
        }
    }

    /// The wrapped dictionary, for queries the overlay does not change.
    pub fn base(&self) -> &DictionaryParser {
        &self.base
    }

    /// CIF2 equivalent of a CIF1 name, overlay consulted after the
    /// dictionary.
    pub fn get_cif2_equivalent(&self, field_name: &str) -> Option<&str> {
        self.base
            .cif2_field(field_name)
            .or_else(|| self.cif1_to_cif2.get(&field_name.to_lowercase()).copied())
    }

    /// CIF1 equivalent of a CIF2 name, overlay consulted after the
    /// dictionary.
    pub fn get_cif1_equivalent(&self, field_name: &str) -> Option<&str> {
        self.base
            .cif1_field(field_name)
            .or_else(|| self.cif2_to_cif1.get(&field_name.to_lowercase()).copied())
    }

    pub fn is_cif2_only_extension(&self, field_name: &str) -> bool {
        let key = field_name.to_lowercase();
        self.cif2_to_cif1.contains_key(&key) || self.cif1_to_cif2.contains_key(&key)
    }

    pub fn is_known_field(&self, field_name: &str) -> bool {
        self.base.is_known_field(field_name) || self.is_cif2_only_extension(field_name)
    }

    pub fn field_status(&self, field_name: &str) -> FieldStatus {
        if self.base.is_known_field(field_name) {
            FieldStatus::Official
        } else if self.is_cif2_only_extension(field_name) {
            FieldStatus::Cif2OnlyExtension
        } else {
            FieldStatus::Unknown
        }
    }
}
