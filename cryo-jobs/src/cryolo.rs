//! crYOLO command lines: `config`, `train` and `predict`.

use crate::invocation::*;

pub const CONFIG_FILE: &str = "config_cryolo.json";
pub const TRAINED_MODEL: &str = "cryolo_model.h5";

pub const FULL_DATA_DIR: &str = "full_data";
pub const TRAIN_IMAGE_DIR: &str = "train_image";
pub const TRAIN_ANNOT_DIR: &str = "train_annot";
pub const BOX_DIR: &str = "boxfiles";

/// one table for all micrographs, rows tagged by micrograph name
pub const COMBINED_STAR: &str = "boxfiles/CRYOSPARC/cryosparc.star";
/// `<stem>.star` per micrograph
pub const PER_MICROGRAPH_STAR_DIR: &str = "boxfiles/STAR";

#[derive(Debug, Clone, PartialEq)]
pub struct CryoloTraining {
    pub image_folder: Box<str>,
    pub annot_folder: Box<str>,
    pub batch_size: usize,
    pub pretrained_weights: Option<Box<str>>,
}

/// `cryolo_gui.py config`
#[derive(Debug, Clone, PartialEq)]
pub struct CryoloConfig {
    pub box_size: usize,
    pub lowpass_cutoff: Option<f64>,
    pub training: Option<CryoloTraining>,
}

impl CryoloConfig {
    pub fn invocation(&self, cwd: &str) -> Result<ToolInvocation, ToolError> {
        check_range("box size", self.box_size as f64, self.box_size > 0, "> 0")?;

        let mut run = ToolInvocation::new("cryolo_gui.py")
            .arg("config")
            .arg(CONFIG_FILE)
            .arg(self.box_size);

        if let Some(cutoff) = self.lowpass_cutoff {
            check_range(
                "low-pass cutoff",
                cutoff,
                cutoff > 0.0 && cutoff <= 0.5,
                "(0, 0.5]",
            )?;
            run = run.opt("--filter", "LOWPASS").opt("--low_pass_cutoff", cutoff);
        }

        if let Some(training) = &self.training {
            check_non_empty("training image folder", &training.image_folder)?;
            check_non_empty("training annotation folder", &training.annot_folder)?;
            check_range(
                "batch size",
                training.batch_size as f64,
                training.batch_size > 0,
                ">= 1",
            )?;

            run = run
                .opt("--train_image_folder", &training.image_folder)
                .opt("--train_annot_folder", &training.annot_folder)
                .opt("--batch_size", training.batch_size);

            if let Some(weights) = &training.pretrained_weights {
                check_non_empty("pretrained weights", weights)?;
                run = run.opt("--pretrained_weights", weights);
            }
        }

        Ok(run.cwd(cwd))
    }
}

/// `cryolo_train.py`
#[derive(Debug, Clone, PartialEq)]
pub struct CryoloTrain {
    pub warmup_epochs: usize,
    pub early_stop: usize,
    pub gpu: usize,
}

impl Default for CryoloTrain {
    fn default() -> Self {
        Self {
            warmup_epochs: 5,
            early_stop: 15,
            gpu: 0,
        }
    }
}

impl CryoloTrain {
    pub fn invocation(&self, cwd: &str) -> Result<ToolInvocation, ToolError> {
        check_range(
            "early stop patience",
            self.early_stop as f64,
            self.early_stop > 0,
            ">= 1",
        )?;

        Ok(ToolInvocation::new("cryolo_train.py")
            .opt("-c", CONFIG_FILE)
            .opt("-w", self.warmup_epochs)
            .opt("-g", self.gpu)
            .opt("-e", self.early_stop)
            .cwd(cwd))
    }
}

/// `cryolo_predict.py`
#[derive(Debug, Clone, PartialEq)]
pub struct CryoloPredict {
    pub weights: Box<str>,
    pub input_dir: Box<str>,
    pub output_dir: Box<str>,
    pub gpu: usize,
    pub threshold: f64,
}

impl CryoloPredict {
    pub fn invocation(&self, cwd: &str) -> Result<ToolInvocation, ToolError> {
        check_non_empty("model weights", &self.weights)?;
        check_non_empty("input folder", &self.input_dir)?;
        check_non_empty("output folder", &self.output_dir)?;
        check_range(
            "threshold",
            self.threshold,
            (0.0..=1.0).contains(&self.threshold),
            "[0, 1]",
        )?;

        Ok(ToolInvocation::new("cryolo_predict.py")
            .opt("-c", CONFIG_FILE)
            .opt("-w", &self.weights)
            .opt("-i", &self.input_dir)
            .opt("-g", self.gpu)
            .opt("-o", &self.output_dir)
            .opt("-t", self.threshold)
            .cwd(cwd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_for_picking() {
        let config = CryoloConfig {
            box_size: 220,
            lowpass_cutoff: Some(0.2),
            training: None,
        };
        let run = config.invocation("J20").unwrap();
        assert_eq!(
            run.args_str(),
            vec!["config", "config_cryolo.json", "220", "--filter", "LOWPASS", "--low_pass_cutoff", "0.2"]
        );
        assert_eq!(run.cwd.as_deref(), Some("J20"));
    }

    #[test]
    fn config_for_training() {
        let config = CryoloConfig {
            box_size: 180,
            lowpass_cutoff: None,
            training: Some(CryoloTraining {
                image_folder: TRAIN_IMAGE_DIR.into(),
                annot_folder: TRAIN_ANNOT_DIR.into(),
                batch_size: 2,
                pretrained_weights: None,
            }),
        };
        let run = config.invocation("J21").unwrap();
        assert_eq!(
            run.args_str(),
            vec![
                "config",
                "config_cryolo.json",
                "180",
                "--train_image_folder",
                "train_image",
                "--train_annot_folder",
                "train_annot",
                "--batch_size",
                "2"
            ]
        );
    }

    #[test]
    fn config_rejects_bad_values() {
        let mut config = CryoloConfig {
            box_size: 0,
            lowpass_cutoff: None,
            training: None,
        };
        assert!(matches!(
            config.invocation("."),
            Err(ToolError::OutOfRange { name: "box size", .. })
        ));

        config.box_size = 100;
        for cutoff in [0.0, 0.6, -0.1] {
            config.lowpass_cutoff = Some(cutoff);
            assert!(config.invocation(".").is_err());
        }
        config.lowpass_cutoff = Some(0.5);
        assert!(config.invocation(".").is_ok());
    }

    #[test]
    fn train_defaults() {
        let run = CryoloTrain::default().invocation("J21").unwrap();
        assert_eq!(run.program.as_ref(), "cryolo_train.py");
        assert_eq!(
            run.args_str(),
            vec!["-c", "config_cryolo.json", "-w", "5", "-g", "0", "-e", "15"]
        );
    }

    #[test]
    fn predict_threshold() {
        let mut predict = CryoloPredict {
            weights: TRAINED_MODEL.into(),
            input_dir: FULL_DATA_DIR.into(),
            output_dir: BOX_DIR.into(),
            gpu: 1,
            threshold: 0.3,
        };
        let run = predict.invocation("J21").unwrap();
        assert_eq!(
            run.args_str(),
            vec!["-c", "config_cryolo.json", "-w", "cryolo_model.h5", "-i", "full_data", "-g", "1", "-o", "boxfiles", "-t", "0.3"]
        );

        predict.threshold = 1.5;
        assert!(predict.invocation("J21").is_err());
        predict.threshold = 0.001;
        assert!(predict.invocation("J21").is_ok());
    }
}
