//! cryoDRGN command lines for a downsampled particle stack with poses and
//! CTF from a cryoSPARC refinement.

use crate::invocation::*;

pub const DOWNSAMPLED_PARTICLES: &str = "downsampled_particles.cs";
pub const POSE_FILE: &str = "pose.pkl";
pub const CTF_FILE: &str = "ctf.pkl";
pub const TRAIN_DIR: &str = "cryodrgn";

///
/// The refinement's particle file: lexicographically last
/// `*particles.cs` that is not a `*passthrough_particles.cs`
///
pub fn select_particles_file<S: AsRef<str>>(files: &[S]) -> Result<&str, ToolError> {
    files
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| f.ends_with("particles.cs") && !f.ends_with("passthrough_particles.cs"))
        .max()
        .ok_or(ToolError::NoParticlesFile(files.len()))
}

/// Requested subset, or every particle
pub fn resolve_subset(requested: Option<usize>, count: usize) -> Result<usize, ToolError> {
    match requested {
        Some(subset) if subset > count => Err(ToolError::SubsetTooLarge { subset, count }),
        Some(0) => Err(ToolError::OutOfRange {
            name: "particle subset",
            value: 0.0,
            range: ">= 1",
        }),
        Some(subset) => Ok(subset),
        None => Ok(count),
    }
}

/// `2,3` style list of GPU ids
pub fn parse_gpu_list(gpus: &str) -> Result<Vec<usize>, ToolError> {
    let bad = || ToolError::GpuList(gpus.into());
    let ids = gpus
        .split(',')
        .map(|x| x.trim().parse::<usize>().map_err(|_| bad()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != ids.len() {
        return Err(bad());
    }
    Ok(ids)
}

/// Everything one cryoDRGN training and analysis needs
#[derive(Debug, Clone, PartialEq)]
pub struct CryodrgnRun {
    /// refinement output with poses and CTF
    pub particles_file: Box<str>,
    pub particle_count: usize,
    pub subset: usize,
    /// box size (pixels) before downsampling
    pub initial_box: usize,
    /// pixel size (Å) after downsampling
    pub downsampled_apix: f64,
    pub zdim: usize,
    pub epochs: usize,
    pub batch: usize,
    pub gpus: Option<Vec<usize>>,
    pub numexpr_max_threads: usize,
    /// root the `.cs` image paths are relative to
    pub data_dir: Box<str>,
    pub job_dir: Box<str>,
}

const ANALYZE_PLOTS: [(&str, &str); 3] = [
    ("z_pca", "z_pca.png"),
    ("pc1_traversal", "pc1/pca_traversal.png"),
    ("pc2_traversal", "pc2/pca_traversal.png"),
];

impl CryodrgnRun {
    fn validate(&self) -> Result<(), ToolError> {
        check_non_empty("particles file", &self.particles_file)?;
        check_non_empty("data directory", &self.data_dir)?;
        check_non_empty("job directory", &self.job_dir)?;
        resolve_subset(Some(self.subset), self.particle_count)?;

        let positive = [
            ("initial box size", self.initial_box),
            ("zdim", self.zdim),
            ("epochs", self.epochs),
            ("batch size", self.batch),
            ("numexpr threads", self.numexpr_max_threads),
        ];
        for (name, value) in positive {
            check_range(name, value as f64, value > 0, ">= 1")?;
        }
        check_range(
            "pixel size",
            self.downsampled_apix,
            self.downsampled_apix > 0.0,
            "> 0",
        )?;
        if let Some(gpus) = &self.gpus {
            if gpus.is_empty() {
                return Err(ToolError::Empty { name: "GPU list" });
            }
        }
        Ok(())
    }

    pub fn index_file(&self) -> String {
        format!("ind{}.pkl", self.subset)
    }

    pub fn analyze_epoch(&self) -> usize {
        self.epochs - 1
    }

    pub fn analyze_dir(&self) -> String {
        format!("{}/cryodrgn_analyze_{}", self.job_dir, self.analyze_epoch())
    }

    /// `(title, file)` of the plots `cryodrgn analyze` leaves behind
    pub fn analyze_plots(&self) -> Vec<(&'static str, String)> {
        let dir = self.analyze_dir();
        ANALYZE_PLOTS
            .iter()
            .map(|(title, file)| (*title, format!("{}/{}", dir, file)))
            .collect()
    }

    pub fn select_random(&self) -> ToolInvocation {
        ToolInvocation::new("cryodrgn_utils")
            .arg("select_random")
            .arg(self.particle_count)
            .opt("-n", self.subset)
            .opt("-o", self.index_file())
            .cwd(&self.job_dir)
    }

    pub fn parse_pose_csparc(&self) -> ToolInvocation {
        ToolInvocation::new("cryodrgn")
            .arg("parse_pose_csparc")
            .arg(&self.particles_file)
            .opt("-D", self.initial_box)
            .opt("-o", POSE_FILE)
            .cwd(&self.job_dir)
    }

    pub fn parse_ctf_csparc(&self) -> ToolInvocation {
        ToolInvocation::new("cryodrgn")
            .arg("parse_ctf_csparc")
            .arg(&self.particles_file)
            .opt("-o", CTF_FILE)
            .cwd(&self.job_dir)
    }

    pub fn train_vae(&self) -> ToolInvocation {
        let mut run = ToolInvocation::new("cryodrgn")
            .arg("train_vae")
            .arg(DOWNSAMPLED_PARTICLES)
            .opt("--ctf", CTF_FILE)
            .opt("--ind", self.index_file())
            .opt("--poses", POSE_FILE)
            .opt("--zdim", self.zdim)
            .opt("-n", self.epochs)
            .opt("-b", self.batch)
            .opt("--datadir", &self.data_dir)
            .opt("-o", TRAIN_DIR)
            .env("NUMEXPR_MAX_THREADS", &self.numexpr_max_threads.to_string())
            .cwd(&self.job_dir);

        if let Some(gpus) = &self.gpus {
            let devices = gpus
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>()
                .join(",");
            run = run.arg("--multigpu").env("CUDA_VISIBLE_DEVICES", &devices);
        }
        run
    }

    pub fn analyze(&self) -> ToolInvocation {
        ToolInvocation::new("cryodrgn")
            .arg("analyze")
            .arg(format!("{}/{}", self.job_dir, TRAIN_DIR))
            .arg(self.analyze_epoch())
            .opt("-o", self.analyze_dir())
            .opt("--Apix", self.downsampled_apix)
            .cwd(&self.job_dir)
    }

    /// The five calls in the order they must run
    pub fn invocations(&self) -> Result<Vec<ToolInvocation>, ToolError> {
        self.validate()?;
        Ok(vec![
            self.select_random(),
            self.parse_pose_csparc(),
            self.parse_ctf_csparc(),
            self.train_vae(),
            self.analyze(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> CryodrgnRun {
        CryodrgnRun {
            particles_file: "J10_004_particles.cs".into(),
            particle_count: 120_000,
            subset: 50_000,
            initial_box: 320,
            downsampled_apix: 3.32,
            zdim: 8,
            epochs: 50,
            batch: 8,
            gpus: None,
            numexpr_max_threads: 32,
            data_dir: "/data/P3".into(),
            job_dir: "/data/P3/J15".into(),
        }
    }

    #[test]
    fn picks_last_non_passthrough() {
        let files = [
            "J10_002_particles.cs",
            "J10_passthrough_particles.cs",
            "J10_004_particles.cs",
            "J10_004_volume.mrc",
            "J10_005_passthrough_particles.cs",
        ];
        assert_eq!(select_particles_file(&files), Ok("J10_004_particles.cs"));
        assert_eq!(
            select_particles_file(&["J10_passthrough_particles.cs"]),
            Err(ToolError::NoParticlesFile(1))
        );
    }

    #[test]
    fn subset_bounds() {
        assert_eq!(resolve_subset(None, 100), Ok(100));
        assert_eq!(resolve_subset(Some(100), 100), Ok(100));
        assert_eq!(
            resolve_subset(Some(101), 100),
            Err(ToolError::SubsetTooLarge {
                subset: 101,
                count: 100
            })
        );
        assert!(resolve_subset(Some(0), 100).is_err());
    }

    #[test]
    fn gpu_lists() {
        assert_eq!(parse_gpu_list("2,3"), Ok(vec![2, 3]));
        assert_eq!(parse_gpu_list("0"), Ok(vec![0]));
        assert!(parse_gpu_list("2;3").is_err());
        assert!(parse_gpu_list("2,,3").is_err());
        assert!(parse_gpu_list("1,1").is_err());
    }

    #[test]
    fn five_calls_in_order() {
        let calls = run().invocations().unwrap();
        assert_eq!(calls.len(), 5);
        assert_eq!(
            calls[0].args_str(),
            vec!["select_random", "120000", "-n", "50000", "-o", "ind50000.pkl"]
        );
        assert_eq!(
            calls[1].args_str(),
            vec!["parse_pose_csparc", "J10_004_particles.cs", "-D", "320", "-o", "pose.pkl"]
        );
        assert_eq!(calls[2].args_str()[0], "parse_ctf_csparc");
        assert_eq!(
            calls[4].args_str(),
            vec![
                "analyze",
                "/data/P3/J15/cryodrgn",
                "49",
                "-o",
                "/data/P3/J15/cryodrgn_analyze_49",
                "--Apix",
                "3.32"
            ]
        );
    }

    #[test]
    fn multigpu_goes_through_env() {
        let mut single = run();
        let train = single.train_vae();
        assert!(!train.args_str().contains(&"--multigpu"));
        assert!(!train.env.contains_key("CUDA_VISIBLE_DEVICES"));
        assert_eq!(train.env["NUMEXPR_MAX_THREADS"].as_ref(), "32");

        single.gpus = Some(vec![2, 3]);
        let train = single.train_vae();
        assert_eq!(train.program.as_ref(), "cryodrgn");
        assert_eq!(train.args_str().last(), Some(&"--multigpu"));
        assert_eq!(train.env["CUDA_VISIBLE_DEVICES"].as_ref(), "2,3");
    }

    #[test]
    fn invalid_runs() {
        let mut bad = run();
        bad.epochs = 0;
        assert!(bad.invocations().is_err());

        let mut bad = run();
        bad.subset = 200_000;
        assert!(matches!(
            bad.invocations(),
            Err(ToolError::SubsetTooLarge { .. })
        ));

        let mut bad = run();
        bad.gpus = Some(vec![]);
        assert!(bad.invocations().is_err());
    }
}
