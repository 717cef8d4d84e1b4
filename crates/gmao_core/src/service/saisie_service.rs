//! Daily entry use-case service.
//!
//! # Invariants
//! - For one engin-day, `hrm + Σ him` never exceeds 24 hours. Every create
//!   and update of either entry kind re-checks it.
//! - Lubricant entries always hang off an existing immobilization entry.

use super::{require_found, ServiceError, ServiceResult};
use crate::model::saisie::{
    SaisieHim, SaisieHimInput, SaisieHrm, SaisieHrmFilter, SaisieHrmInput, SaisieLubrifiant,
    SaisieLubrifiantInput, HOURS_PER_DAY,
};
use crate::model::{EntityId, ValidationError};
use crate::repo::saisie_repo::SaisieRepository;

/// Float slack for sums of user-entered hours.
const CAPACITY_EPSILON: f64 = 1e-9;

pub struct SaisieService<R: SaisieRepository> {
    repo: R,
}

impl<R: SaisieRepository> SaisieService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_hrm(&self, input: &SaisieHrmInput) -> ServiceResult<SaisieHrm> {
        input.validate()?;
        let id = self.repo.create_hrm(input)?;
        self.read_back(self.repo.get_hrm(id)?)
    }

    pub fn update_hrm(&self, id: EntityId, input: &SaisieHrmInput) -> ServiceResult<SaisieHrm> {
        input.validate()?;
        require_found(self.repo.get_hrm(id)?, "saisiehrm", id)?;
        let used = self.repo.sum_him(id, None)?;
        ensure_capacity("hrm", input.hrm + used)?;
        self.repo.update_hrm(id, input)?;
        self.read_back(self.repo.get_hrm(id)?)
    }

    /// Creates the engin-day entry or replaces its `hrm` and site.
    pub fn upsert_hrm(&self, input: &SaisieHrmInput) -> ServiceResult<SaisieHrm> {
        match self.repo.find_hrm(input.engin_id, input.du)? {
            Some(existing) => self.update_hrm(existing.id, input),
            None => self.create_hrm(input),
        }
    }

    pub fn get_hrm(&self, id: EntityId) -> ServiceResult<SaisieHrm> {
        require_found(self.repo.get_hrm(id)?, "saisiehrm", id)
    }

    pub fn list_hrm(&self, filter: &SaisieHrmFilter) -> ServiceResult<Vec<SaisieHrm>> {
        Ok(self.repo.list_hrm(filter)?)
    }

    pub fn delete_hrm(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_hrm(id)?)
    }

    pub fn create_him(&self, input: &SaisieHimInput) -> ServiceResult<SaisieHim> {
        input.validate()?;
        let hrm = require_found(
            self.repo.get_hrm(input.saisiehrm_id)?,
            "saisiehrm",
            input.saisiehrm_id,
        )?;
        let used = self.repo.sum_him(hrm.id, None)?;
        ensure_capacity("him", hrm.hrm + used + input.him)?;
        let id = self.repo.create_him(input)?;
        self.read_back(self.repo.get_him(id)?)
    }

    pub fn update_him(&self, id: EntityId, input: &SaisieHimInput) -> ServiceResult<SaisieHim> {
        input.validate()?;
        require_found(self.repo.get_him(id)?, "saisiehim", id)?;
        let hrm = require_found(
            self.repo.get_hrm(input.saisiehrm_id)?,
            "saisiehrm",
            input.saisiehrm_id,
        )?;
        let used = self.repo.sum_him(hrm.id, Some(id))?;
        ensure_capacity("him", hrm.hrm + used + input.him)?;
        self.repo.update_him(id, input)?;
        self.read_back(self.repo.get_him(id)?)
    }

    pub fn get_him(&self, id: EntityId) -> ServiceResult<SaisieHim> {
        require_found(self.repo.get_him(id)?, "saisiehim", id)
    }

    pub fn list_him(&self, saisiehrm_id: EntityId) -> ServiceResult<Vec<SaisieHim>> {
        require_found(self.repo.get_hrm(saisiehrm_id)?, "saisiehrm", saisiehrm_id)?;
        Ok(self.repo.list_him(saisiehrm_id)?)
    }

    pub fn delete_him(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_him(id)?)
    }

    pub fn create_lubrifiant(
        &self,
        input: &SaisieLubrifiantInput,
    ) -> ServiceResult<SaisieLubrifiant> {
        input.validate()?;
        require_found(
            self.repo.get_him(input.saisiehim_id)?,
            "saisiehim",
            input.saisiehim_id,
        )?;
        let id = self.repo.create_lubrifiant(input)?;
        self.read_back(self.repo.get_lubrifiant(id)?)
    }

    pub fn update_lubrifiant(
        &self,
        id: EntityId,
        input: &SaisieLubrifiantInput,
    ) -> ServiceResult<SaisieLubrifiant> {
        input.validate()?;
        require_found(
            self.repo.get_him(input.saisiehim_id)?,
            "saisiehim",
            input.saisiehim_id,
        )?;
        self.repo.update_lubrifiant(id, input)?;
        self.read_back(self.repo.get_lubrifiant(id)?)
    }

    pub fn get_lubrifiant(&self, id: EntityId) -> ServiceResult<SaisieLubrifiant> {
        require_found(self.repo.get_lubrifiant(id)?, "saisielubrifiant", id)
    }

    pub fn list_lubrifiant(&self, saisiehim_id: EntityId) -> ServiceResult<Vec<SaisieLubrifiant>> {
        require_found(self.repo.get_him(saisiehim_id)?, "saisiehim", saisiehim_id)?;
        Ok(self.repo.list_lubrifiant(saisiehim_id)?)
    }

    pub fn delete_lubrifiant(&self, id: EntityId) -> ServiceResult<()> {
        Ok(self.repo.delete_lubrifiant(id)?)
    }

    fn read_back<T>(&self, value: Option<T>) -> ServiceResult<T> {
        value.ok_or(ServiceError::InconsistentState(
            "written entry not found in read-back",
        ))
    }
}

fn ensure_capacity(field: &'static str, total: f64) -> Result<(), ValidationError> {
    if total > HOURS_PER_DAY + CAPACITY_EPSILON {
        return Err(ValidationError::OutOfRange {
            field,
            detail: format!("hrm + him would total {total:.2} h, above {HOURS_PER_DAY} h per day"),
        });
    }
    Ok(())
}
