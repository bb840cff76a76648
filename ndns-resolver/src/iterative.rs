use std::time::Duration;

use tokio::time::timeout;
use tracing::Instrument;

use ndns_face::{Face, FaceError, Interest};
use ndns_types::{Content, Name, RecordType, Response};

use crate::cache::FifoCache;
use crate::error::ResolutionError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
const MAX_LINK_REDIRECTS: usize = 4;

/// The iterative query controller's state (spec §4.6): a single-task
/// cooperative state machine that walks the zone hierarchy one label at a
/// time, looking for the deepest NS delegation before asking the final
/// zone for the answer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Step {
    QueryNs,
    QueryRr,
}

/// The result of a successful `RESP`/`BLOB`/`KEY`/`AUTH` answer, a proven
/// absence, or a `LINK` redirect to follow.
enum RrOutcome {
    Answer {
        content: Content,
        freshness_period: u32,
    },
    Absent(Option<Content>),
    Link(Vec<Name>),
}

/// The result of probing a single `NS` step (spec §4.6 `QueryNS`
/// transitions): a successful delegation, a proven absence (carrying the
/// response's own DOE proof, if any, rather than discarding it), or an
/// `AUTH` marker meaning "nothing at this depth, but something exists
/// further down" (carrying the real `AUTH` content, since that response is
/// exactly the proof surfaced to the caller if the walk terminates here) —
/// which extends the probe by one more label without advancing the
/// confirmed delegation depth.
enum NsOutcome {
    Link(Vec<Name>),
    Nack(Option<Content>),
    Auth(Content),
}

/// The outcome of a complete resolution run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    Success {
        content: Content,
        freshness_period: u32,
        working_zone: Name,
    },
    /// The name was proven not to exist (or a bare NACK arrived with no
    /// proof) at `working_zone`.
    Absent {
        working_zone: Name,
        proof: Option<Content>,
    },
    Failure(ResolutionError),
}

/// Resolves `target`'s `rr_type` rrset by iteratively walking the zone
/// hierarchy from `start_component_index` (spec §4.6). Each run is a fresh
/// controller instance; the NS cache may be shared across runs.
pub struct IterativeQueryController<'a> {
    face: &'a dyn Face,
    ns_cache: &'a FifoCache,
    target: Name,
    rr_type: RecordType,
    start_component_index: usize,
    timeout: Duration,
}

impl<'a> IterativeQueryController<'a> {
    pub fn new(
        face: &'a dyn Face,
        ns_cache: &'a FifoCache,
        target: Name,
        rr_type: RecordType,
    ) -> Self {
        IterativeQueryController {
            face,
            ns_cache,
            target,
            rr_type,
            start_component_index: 0,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_start_component_index(mut self, index: usize) -> Self {
        self.start_component_index = index;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve(self) -> Outcome {
        let target = self.target.clone();
        match timeout(self.timeout, self.resolve_notimeout())
            .instrument(tracing::error_span!("iterative_resolve", %target, rr_type = %self.rr_type))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::debug!(%target, "iterative resolution timed out");
                Outcome::Failure(ResolutionError::Aborted {
                    target,
                    reason: "timed out".to_string(),
                })
            }
        }
    }

    async fn resolve_notimeout(&self) -> Outcome {
        let domain_len = self.target.len();

        // Open question (resolved): when the caller already knows the
        // answer lives in a zone as deep as the whole target name, there
        // is nothing left to delegate through, so the NS-walk step is
        // skipped entirely and we go straight to the final lookup.
        let mut step = if self.start_component_index >= domain_len {
            Step::QueryRr
        } else {
            Step::QueryNs
        };

        let mut n_finished_comps = self.start_component_index;
        let mut forwarding_hint: Option<Vec<Name>> = None;
        let mut link_redirects = 0usize;
        let mut interests_sent = 0usize;
        let max_interests = domain_len.saturating_sub(self.start_component_index) + 1;

        loop {
            if interests_sent > max_interests {
                return Outcome::Failure(ResolutionError::Aborted {
                    target: self.target.clone(),
                    reason: "interest-count bound exceeded".to_string(),
                });
            }

            match step {
                Step::QueryNs => {
                    // `n_try_comps` folds further labels into the next NS
                    // probe past `n_finished_comps` (spec §4.6); it grows by
                    // one, rather than the confirmed depth advancing, every
                    // time the probe comes back AUTH ("something further
                    // down exists, but not here").
                    let mut n_try_comps = 1usize;
                    loop {
                        interests_sent += 1;
                        if interests_sent > max_interests {
                            return Outcome::Failure(ResolutionError::Aborted {
                                target: self.target.clone(),
                                reason: "interest-count bound exceeded".to_string(),
                            });
                        }
                        let prefix = self.target.prefix(n_finished_comps + n_try_comps);
                        match self.query_ns(&prefix, forwarding_hint.clone()).await {
                            Ok(NsOutcome::Link(names)) => {
                                if n_finished_comps + n_try_comps == domain_len
                                    && self.rr_type == RecordType::Ns
                                {
                                    return Outcome::Success {
                                        content: Content::Link(names),
                                        freshness_period: 0,
                                        working_zone: self.target.prefix(n_finished_comps + n_try_comps),
                                    };
                                }
                                n_finished_comps += n_try_comps;
                                n_try_comps = 1;
                            }
                            Ok(NsOutcome::Auth(content)) => {
                                n_try_comps += 1;
                                if n_finished_comps + n_try_comps > domain_len {
                                    if self.rr_type == RecordType::Ns {
                                        // The probe ran past the target's own
                                        // depth without ever seeing a LINK
                                        // for it: the NS itself does not
                                        // exist, only something beneath it
                                        // does, and the AUTH response itself
                                        // is the proof of that.
                                        return Outcome::Absent {
                                            working_zone: self.target.prefix(n_finished_comps),
                                            proof: Some(content),
                                        };
                                    }
                                    step = Step::QueryRr;
                                    break;
                                }
                            }
                            Ok(NsOutcome::Nack(proof)) => {
                                if n_finished_comps + n_try_comps == domain_len
                                    && self.rr_type != RecordType::Ns
                                {
                                    step = Step::QueryRr;
                                } else {
                                    return Outcome::Absent {
                                        working_zone: self.target.prefix(n_finished_comps),
                                        proof,
                                    };
                                }
                                break;
                            }
                            Err(err) => return Outcome::Failure(err),
                        }
                        if n_finished_comps + n_try_comps > domain_len {
                            step = Step::QueryRr;
                            break;
                        }
                    }
                }
                Step::QueryRr => {
                    interests_sent += 1;
                    let working_zone = self.target.prefix(n_finished_comps);
                    let label = self.target.suffix(n_finished_comps);
                    match self.query_rr(&working_zone, &label, forwarding_hint.clone()).await {
                        Ok(RrOutcome::Answer {
                            content,
                            freshness_period,
                        }) => {
                            return Outcome::Success {
                                content,
                                freshness_period,
                                working_zone,
                            }
                        }
                        Ok(RrOutcome::Absent(proof)) => {
                            return Outcome::Absent {
                                working_zone,
                                proof,
                            }
                        }
                        Ok(RrOutcome::Link(names)) => {
                            link_redirects += 1;
                            if link_redirects > MAX_LINK_REDIRECTS {
                                return Outcome::Failure(ResolutionError::Aborted {
                                    target: self.target.clone(),
                                    reason: "too many LINK redirects".to_string(),
                                });
                            }
                            tracing::trace!(?names, "following LINK delegation as a forwarding hint");
                            forwarding_hint = Some(names);
                            step = Step::QueryRr;
                        }
                        Err(err) => return Outcome::Failure(err),
                    }
                }
            }
        }
    }

    async fn query_ns(
        &self,
        prefix: &Name,
        hint: Option<Vec<Name>>,
    ) -> Result<NsOutcome, ResolutionError> {
        let query_name = prefix.append_label("NDNS").append_label("NS");

        if let Some(cached) = self.ns_cache.get(&query_name) {
            return Self::decode_ns(&cached.content, &query_name);
        }

        let mut interest = Interest::new(query_name.clone());
        if let Some(hint) = hint {
            interest = interest.with_forwarding_hint(hint);
        }

        match self.face.send_interest(interest).await {
            Ok(data) => {
                let response = Response::from_octets(&data.content).map_err(|err| ResolutionError::Protocol {
                    target: query_name.clone(),
                    reason: err.to_string(),
                })?;
                self.ns_cache.insert(query_name.clone(), data, response.freshness_period);
                Self::content_to_ns_outcome(response.content, &query_name)
            }
            Err(FaceError::Timeout) => Err(ResolutionError::Aborted {
                target: query_name,
                reason: "timed out querying NS".to_string(),
            }),
            // A transport-layer NACK (distinct from the application-layer
            // `Content::Nack`) carries no response to surface as proof.
            Err(_) => Ok(NsOutcome::Nack(None)),
        }
    }

    /// Decodes an NS probe's response content-type (spec §4.6 `QueryNS`
    /// transitions). `LINK` is the record factory's own wire form for a
    /// successful delegation; a bare `RESP` of encoded names is also
    /// accepted as an equivalent legacy form. `AUTH` extends the probe
    /// without resolving a delegation; anything else is a protocol error.
    fn decode_ns(octets: &[u8], query_name: &Name) -> Result<NsOutcome, ResolutionError> {
        let response = Response::from_octets(octets).map_err(|err| ResolutionError::Protocol {
            target: query_name.clone(),
            reason: err.to_string(),
        })?;
        Self::content_to_ns_outcome(response.content, query_name)
    }

    /// Shared by a fresh fetch and a cache hit: dispatches on the decoded
    /// content-type, keeping the real `NACK`/`AUTH` payload (spec §4.6
    /// AnswerStub "parse the response... call the success callback with
    /// (data, parsedResponse)") rather than discarding it.
    fn content_to_ns_outcome(content: Content, query_name: &Name) -> Result<NsOutcome, ResolutionError> {
        match content {
            Content::Link(names) => Ok(NsOutcome::Link(names)),
            Content::Resp(subrecords) => {
                let names = subrecords
                    .iter()
                    .filter_map(|sub| Name::from_octets(&sub.octets).ok())
                    .collect();
                Ok(NsOutcome::Link(names))
            }
            Content::Nack(proof) => Ok(NsOutcome::Nack(proof.map(|boxed| *boxed))),
            Content::Auth(bytes) => Ok(NsOutcome::Auth(Content::Auth(bytes))),
            _ => Err(ResolutionError::Protocol {
                target: query_name.clone(),
                reason: "unexpected content type for an NS query".to_string(),
            }),
        }
    }

    async fn query_rr(
        &self,
        zone: &Name,
        label: &Name,
        hint: Option<Vec<Name>>,
    ) -> Result<RrOutcome, ResolutionError> {
        let query_name = zone
            .append_label(self.rr_type.query_kind().label())
            .append_name(label)
            .append_label(self.rr_type.label());

        let mut interest = Interest::new(query_name.clone());
        if let Some(hint) = hint {
            interest = interest.with_forwarding_hint(hint);
        }

        let data = self
            .face
            .send_interest(interest)
            .await
            .map_err(|err| ResolutionError::Aborted {
                target: query_name.clone(),
                reason: err.to_string(),
            })?;

        let response = Response::from_octets(&data.content).map_err(|err| ResolutionError::Protocol {
            target: query_name.clone(),
            reason: err.to_string(),
        })?;

        match response.content {
            Content::Link(names) => Ok(RrOutcome::Link(names)),
            Content::Nack(proof) => Ok(RrOutcome::Absent(proof.map(|boxed| *boxed))),
            other => Ok(RrOutcome::Answer {
                content: other,
                freshness_period: response.freshness_period,
            }),
        }
    }
}
