//! Anomaly backlog use-case service.
//!
//! # Invariants
//! - Backlog numbers are `BL-{year}-{seq:04}` with a per-year sequence that
//!   is never reused.
//! - Status only moves along the lifecycle graph of `AnomalieStatut`.
//! - Executed anomalies are read-only.

use super::{require_found, ServiceError, ServiceResult};
use crate::model::anomalie::{
    backlog_year, format_backlog_number, Anomalie, AnomalieFilter, AnomalieInput,
    AnomalieStatut, TransitionRequest,
};
use crate::model::{EntityId, ValidationError};
use crate::report::AnomalieStats;
use crate::repo::anomalie_repo::{AnomalieRepository, BacklogNumber};
use log::info;

pub struct AnomalieService<R: AnomalieRepository> {
    repo: R,
}

impl<R: AnomalieRepository> AnomalieService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an anomaly with a fresh backlog number and initial status.
    pub fn create(&self, input: &AnomalieInput) -> ServiceResult<Anomalie> {
        input.validate()?;
        let year = backlog_year(input.date_detection);
        let seq = self.repo.reserve_backlog_seq(year)?;
        let backlog = BacklogNumber {
            year,
            seq,
            formatted: format_backlog_number(year, seq),
        };
        let statut = AnomalieStatut::initial(input.besoin_pdr);
        let id = self.repo.create(input, &backlog, statut)?;
        info!(
            "event=anomalie_create module=service status=ok id={id} numero={} statut={}",
            backlog.formatted,
            statut.as_str()
        );
        self.read_back(id)
    }

    pub fn update(&self, id: EntityId, input: &AnomalieInput) -> ServiceResult<Anomalie> {
        input.validate()?;
        let current = require_found(self.repo.get(id)?, "anomalie", id)?;
        if current.statut.is_terminal() {
            return Err(ServiceError::Conflict {
                entity: "anomalie",
                detail: format!("{} is executed and read-only", current.numero_backlog),
            });
        }
        self.repo.update(id, input)?;
        if let Some(statut) = pdr_status_after_edit(current.statut, input.besoin_pdr) {
            self.repo.set_status(id, statut, None, None)?;
            info!(
                "event=anomalie_transition module=service status=ok id={id} from={} to={} reason=besoin_pdr",
                current.statut.as_str(),
                statut.as_str()
            );
        }
        self.read_back(id)
    }

    /// Moves an anomaly to `request.statut`, checking the dates it requires.
    pub fn transition(&self, id: EntityId, request: &TransitionRequest) -> ServiceResult<Anomalie> {
        let current = require_found(self.repo.get(id)?, "anomalie", id)?;
        let from = current.statut;
        let to = request.statut;
        if !from.can_transition_to(to) {
            return Err(ServiceError::InvalidTransition { from, to });
        }

        let (date_programmation, date_execution) = match to {
            AnomalieStatut::Programmee => {
                let date = request
                    .date_programmation
                    .ok_or(ValidationError::EmptyField("date_programmation"))?;
                (Some(date), None)
            }
            AnomalieStatut::Executee => {
                let date = request
                    .date_execution
                    .ok_or(ValidationError::EmptyField("date_execution"))?;
                if date < current.date_detection {
                    return Err(ValidationError::OutOfRange {
                        field: "date_execution",
                        detail: format!(
                            "{date} is before the detection date {}",
                            current.date_detection
                        ),
                    }
                    .into());
                }
                (current.date_programmation, Some(date))
            }
            AnomalieStatut::NonProgrammee => (None, None),
            AnomalieStatut::AttentePdr | AnomalieStatut::PdrPret => {
                (current.date_programmation, None)
            }
        };

        self.repo
            .set_status(id, to, date_programmation, date_execution)?;
        info!(
            "event=anomalie_transition module=service status=ok id={id} from={} to={}",
            from.as_str(),
            to.as_str()
        );
        self.read_back(id)
    }

    pub fn get(&self, id: EntityId) -> ServiceResult<Anomalie> {
        require_found(self.repo.get(id)?, "anomalie", id)
    }

    pub fn list(&self, filter: &AnomalieFilter) -> ServiceResult<Vec<Anomalie>> {
        Ok(self.repo.list(filter)?)
    }

    pub fn delete(&self, id: EntityId) -> ServiceResult<()> {
        self.repo.delete(id)?;
        info!("event=anomalie_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Counts by status and by priority, optionally per site.
    pub fn stats(&self, site_id: Option<EntityId>) -> ServiceResult<AnomalieStats> {
        let by_statut = self.repo.count_by_statut(site_id)?;
        let by_priorite = self.repo.count_by_priorite(site_id, false)?;
        let open_by_priorite = self.repo.count_by_priorite(site_id, true)?;
        let total: i64 = by_statut.values().sum();
        let executed = by_statut
            .get(&AnomalieStatut::Executee)
            .copied()
            .unwrap_or(0);
        Ok(AnomalieStats {
            site_id,
            total,
            by_statut,
            by_priorite,
            open_by_priorite,
            open_backlog: total - executed,
        })
    }

    fn read_back(&self, id: EntityId) -> ServiceResult<Anomalie> {
        self.repo.get(id)?.ok_or(ServiceError::InconsistentState(
            "written anomalie not found in read-back",
        ))
    }
}

/// Unscheduled anomalies follow their spare-part need: dropping the need
/// leaves `ATTENTE_PDR`, adding one enters it.
fn pdr_status_after_edit(current: AnomalieStatut, besoin_pdr: bool) -> Option<AnomalieStatut> {
    match (current, besoin_pdr) {
        (AnomalieStatut::AttentePdr, false) => Some(AnomalieStatut::NonProgrammee),
        (AnomalieStatut::NonProgrammee, true) => Some(AnomalieStatut::AttentePdr),
        _ => None,
    }
}
