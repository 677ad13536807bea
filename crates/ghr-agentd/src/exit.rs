use ghr_core::CoreError;
use ghr_exec::ExecError;
use ghr_model::ModelError;
use ghr_observe::LoggerError;

/// Exit code for a startup failure, taken from the first typed error in the chain.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ExecError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<CoreError>() {
            return e.exit_code();
        }
        if cause.is::<ModelError>() || cause.is::<LoggerError>() {
            return 2;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn typed_errors_keep_their_codes() {
        let err = anyhow::Error::new(CoreError::Asset("gone".into()));
        assert_eq!(exit_code(&err), 5);

        let err = anyhow::Error::new(ExecError::Privilege("setuid".into()));
        assert_eq!(exit_code(&err), 7);

        let err = anyhow::Error::new(ExecError::Core(CoreError::TokenAcquisition { raw: String::new() }));
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn context_does_not_hide_the_cause() {
        let err: anyhow::Result<()> = Err(ModelError::EmptyWorkerName).context("validating settings");
        assert_eq!(exit_code(&err.unwrap_err()), 2);
    }

    #[test]
    fn untyped_errors_are_generic() {
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), 1);
    }
}
