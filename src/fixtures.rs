#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::schema::MasterSchema;

    /// Smallest useful schema.
    pub const BASIC_SCHEMA: &str = "\
[basic]
num_users: type=int, default=1, min=1, description=Number of users
login:     default=guest, options=[guest auth admin], description=Login mode
";

    /// Fills `basic` whenever the section is present.
    pub const BASIC_RECIPES: &str = "\
[basic_recipe]
basic_trigger: has_section=basic
basic:         apply_defaults=true
";

    /// A model-run schema with every kind of type.
    pub const CORE_SCHEMA: &str = "\
# Core schema of a gridded model run

[topo]
type:       default=netcdf, options=[netcdf ipw],
            description=Topo input format
filename:   type=criticalfilename, default=./topo.nc,
            description=Path to the topo file

[time]
time_step:  type=int, default=60, min=1, max=1440,
            description=Model time step in minutes
start_date: type=datetimeorderedpair, description=Start of the run
end_date:   type=datetimeorderedpair, description=End of the run
time_zone:  default=utc, description=Time zone of the data

[csv]
stations:   type=string list, description=Station names to use
wind_speed: type=filename, description=Wind speed data file

[gridded]
data_type:  default=wrf, options=[wrf hrrr netcdf], description=Gridded data source
wrf_file:   type=filename, description=WRF output file

[precip]
distribution:         default=dk, options=[dk idw kriging grid],
                      description=Interpolation method
dk_ncores:            type=int, default=1, description=Cores for detrended kriging
idw_power:            type=float, default=2.0, min=0, description=IDW power
krig_variogram_model: default=linear, options=[linear power gaussian],
                      description=Variogram model
detrend:              type=bool, default=true, description=Detrend the data

[air_temp]
distribution: default=idw, options=[dk idw kriging grid]
dk_ncores:    type=int, default=1
idw_power:    type=float, default=2.0
detrend:      type=bool, default=true
max:          type=float, default=47.0
min:          type=float, default=-73.0

[thermal]
distribution:  default=grid, options=[grid idw]
correct_cloud: type=bool, default=true

[output]
out_location: type=directory, default=./output
frequency:    type=int, default=1, min=1
variables:    type=string list, default=[thermal air_temp precip]
";

    /// Recipes for [`CORE_SCHEMA`].
    pub const CORE_RECIPES: &str = "\
[topo_basic_recipe]
trigger_type:    has_value=[topo type netcdf]
topo:            filename=default

[time_recipe]
time_trigger:    has_section=time
time:            apply_defaults=true

[csv_recipe]
csv_trigger:     has_section=csv
csv:             apply_defaults=true
gridded:         remove_section=true

[gridded_recipe]
gridded_trigger: has_section=gridded
gridded:         apply_defaults=true
csv:             remove_section=true

[wrf_thermal_recipe]
wrf_trigger:     has_value=[gridded data_type wrf]
thermal:         remove_item=distribution

[idw_recipe]
idw_trigger:     has_value=[any distribution idw]
any:             idw_power=default, remove_item=dk_ncores

[krig_recipe]
krig_trigger:    has_value=[any distribution kriging]
any:             default_item=krig_variogram_model, remove_item=dk_ncores

[output_recipe]
output_trigger:  has_section=output
output:          apply_defaults=true
";

    /// A user config for [`CORE_SCHEMA`].
    pub const FULL_CONFIG: &str = "\
[topo]
type:     netcdf
filename: topo.nc

[time]
start_date: 2019-10-01 15:00
end_date:   2019-10-02 15:00

[csv]
stations: rmesp1, tlfi1

[precip]
distribution: idw
dk_ncores:    2

[air_temp]
distribution: dk

[output]
frequency: 2
";

    pub fn core_schema() -> MasterSchema {
        MasterSchema::builder()
            .text(CORE_SCHEMA)
            .text(CORE_RECIPES)
            .title("topo", "Topographic Data")
            .header("Test model configuration")
            .load()
            .unwrap()
    }

    /// Write `content` as `config.ini` in a fresh temp dir, next to an empty
    /// `topo.nc` so the critical file check passes.
    pub fn write_config(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("topo.nc"), "").unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn fixtures_load() {
        let schema = core_schema();
        assert_eq!(schema.cfg.len(), 8);
        assert_eq!(schema.recipes.len(), 8);
        crate::parse::parse_str(FULL_CONFIG).unwrap();
        MasterSchema::builder()
            .text(BASIC_SCHEMA)
            .text(BASIC_RECIPES)
            .load()
            .unwrap();
    }
}
