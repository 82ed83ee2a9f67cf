use crate::error::ModelError;

/// Checks an NCHW image tensor against an expected channel count and a
/// spatial stride that both height and width must be multiples of.
pub(crate) fn check_image(
    input: &'static str,
    dims: [usize; 4],
    channels: usize,
    multiple: usize,
) -> Result<(), ModelError> {
    let [batch, actual, height, width] = dims;

    if batch == 0 {
        return Err(ModelError::ZeroSized { field: "batch" });
    }
    if actual != channels {
        return Err(ModelError::ChannelMismatch {
            input,
            expected: channels,
            actual,
        });
    }

    let fits = |size: usize| size > 0 && size % multiple == 0;
    if !fits(height) || !fits(width) {
        return Err(ModelError::SpatialSize {
            input,
            height,
            width,
            multiple,
        });
    }

    Ok(())
}

pub(crate) fn check_same<const D: usize>(
    input: &'static str,
    expected: [usize; D],
    actual: [usize; D],
) -> Result<(), ModelError> {
    if expected != actual {
        return Err(ModelError::ShapeMismatch {
            input,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_multiples_of_the_stride() {
        assert!(check_image("x", [2, 1, 512, 256], 1, 256).is_ok());
    }

    #[test]
    fn rejects_wrong_channel_count() {
        let err = check_image("x", [1, 3, 256, 256], 1, 256).unwrap_err();
        assert_eq!(
            err,
            ModelError::ChannelMismatch {
                input: "x",
                expected: 1,
                actual: 3
            }
        );
    }

    #[test]
    fn rejects_partial_and_empty_sizes() {
        assert!(matches!(
            check_image("x", [1, 1, 200, 256], 1, 256),
            Err(ModelError::SpatialSize { height: 200, .. })
        ));
        assert!(matches!(
            check_image("x", [1, 1, 0, 0], 1, 16),
            Err(ModelError::SpatialSize { .. })
        ));
    }

    #[test]
    fn rejects_empty_batch() {
        assert_eq!(
            check_image("x", [0, 1, 256, 256], 1, 256),
            Err(ModelError::ZeroSized { field: "batch" })
        );
    }

    #[test]
    fn shape_mismatch_reports_both_shapes() {
        let err = check_same("target", [1, 1, 32, 32], [1, 1, 32, 16]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "target: shape [1, 1, 32, 16] does not match [1, 1, 32, 32]"
        );
    }
}
